//! Gemini CLI argument construction.

use gmt_core::{InvocationRequest, OutputFormat};
use tokio::process::Command;

use crate::config::EngineConfig;

/// Build the child-process command for one invocation attempt.
///
/// `model` is resolved by the caller (request override, default, or fallback).
pub fn build_command(config: &EngineConfig, req: &InvocationRequest, model: &str) -> Command {
    let mut cmd = Command::new(&config.executable);
    cmd.arg("-m").arg(model);
    if req.sandbox {
        cmd.arg("-s");
    }
    cmd.arg("-y");
    if req.output_format != OutputFormat::Text {
        cmd.arg("--output-format").arg(req.output_format.as_flag());
    }
    cmd.arg("-p").arg(&req.prompt);
    cmd
}
