use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gmt_engine::EngineConfig;

mod server;
mod tools;

#[derive(Parser)]
#[command(
    name = "gemini-mcp",
    version,
    about = "MCP server exposing the Gemini CLI as tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdio (the default when no subcommand is given).
    Serve {
        /// Path to an engine config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Verify the Gemini CLI is installed and reachable.
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => {
            let config = EngineConfig::load(config.as_deref())?;
            server::run(config).await
        }
        Commands::Check { config } => {
            let config = EngineConfig::load(config.as_deref())?;
            match gmt_process::check_tool_installed(&config.executable).await {
                Ok(()) => {
                    println!("ok: '{}' found on PATH", config.executable);
                    Ok(())
                }
                Err(error) => {
                    eprintln!(
                        "missing: {error}\n\nInstall the Gemini CLI (npm install -g \
                         @google/gemini-cli) or point {} at it.",
                        gmt_engine::config::GEMINI_BIN_ENV
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}
