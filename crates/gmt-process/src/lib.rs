//! Process management for Gemini CLI invocations: spawning, output capture,
//! termination, and the progress heartbeat.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub mod progress;

pub use progress::{Heartbeat, ProgressChannel};

/// Result of one completed child process.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Captured stdout.
    pub output: String,
    /// Captured stderr.
    pub stderr_output: String,
    /// Last non-empty line of the relevant stream, truncated to 200 chars.
    pub summary: String,
    /// Exit code (1 if signal-killed).
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text for failures: stderr when present, stdout otherwise,
    /// `"exit code N"` when both streams are empty.
    pub fn diagnostic(&self) -> String {
        let stderr_line = last_non_empty_line(&self.stderr_output);
        if !stderr_line.is_empty() {
            return self.stderr_output.trim().to_string();
        }
        let stdout_line = last_non_empty_line(&self.output);
        if !stdout_line.is_empty() {
            return self.output.trim().to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Spawn the external CLI without waiting for it to complete.
///
/// - stdout and stderr are piped
/// - the child is isolated in its own process group (setsid) so the whole
///   subprocess tree can be terminated on cancellation
/// - kill_on_drop is a safety net against leaked children
pub fn spawn_tool(mut cmd: Command) -> Result<Child> {
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec, so no Rust
    // runtime state exists in the child yet.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    cmd.spawn().context("Failed to spawn command")
}

/// Read both output streams until EOF, then wait for the exit status.
///
/// Takes the piped handles out of `child` but leaves the child borrowed, so a
/// caller racing this future against a cancellation signal can still
/// [`terminate`] the process.
pub async fn wait_and_capture(child: &mut Child) -> Result<ExecutionResult> {
    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_line = String::new();
    let mut stderr_line = String::new();
    let mut output = String::new();
    let mut stderr_output = String::new();

    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            result = stdout_reader.read_line(&mut stdout_line), if !stdout_done => {
                match result {
                    Ok(0) => stdout_done = true,
                    Ok(_) => {
                        output.push_str(&stdout_line);
                        stdout_line.clear();
                    }
                    Err(_) => stdout_done = true,
                }
            }
            result = stderr_reader.read_line(&mut stderr_line), if !stderr_done => {
                match result {
                    Ok(0) => stderr_done = true,
                    Ok(_) => {
                        stderr_output.push_str(&stderr_line);
                        stderr_line.clear();
                    }
                    Err(_) => stderr_done = true,
                }
            }
        }
    }

    let status = child.wait().await.context("Failed to wait for command")?;

    let exit_code = status.code().unwrap_or_else(|| {
        warn!("Process terminated by signal, using exit code 1");
        1
    });

    let summary = if exit_code == 0 {
        extract_summary(&output)
    } else {
        failure_summary(&output, &stderr_output, exit_code)
    };

    Ok(ExecutionResult {
        output,
        stderr_output,
        summary,
        exit_code,
    })
}

/// Kill a child and its whole process group, then reap it.
///
/// Used on cancellation and timeout. The child was started with setsid, so its
/// PID doubles as the process-group ID.
pub async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: killpg on a process group we created; worst case is ESRCH
        // when the group already exited.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }

    if let Err(error) = child.start_kill() {
        debug!(%error, "start_kill after killpg failed (child likely already dead)");
    }
    if let Err(error) = child.wait().await {
        debug!(%error, "failed to reap terminated child");
    }
}

/// Check whether an executable is reachable on PATH.
pub async fn check_tool_installed(executable: &str) -> Result<()> {
    let output = Command::new("which")
        .arg(executable)
        .output()
        .await
        .context("Failed to execute 'which' command")?;

    if !output.status.success() {
        anyhow::bail!("Tool '{}' is not installed or not in PATH", executable);
    }

    Ok(())
}

/// Extract summary from output (last non-empty line, truncated to 200 chars).
fn extract_summary(output: &str) -> String {
    truncate_line(last_non_empty_line(output), 200)
}

/// Summary for failed executions: stderr first (the CLI writes quota and auth
/// errors there), stdout second, exit code last.
fn failure_summary(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let stderr_line = last_non_empty_line(stderr);
    if !stderr_line.is_empty() {
        return truncate_line(stderr_line, 200);
    }

    let stdout_line = last_non_empty_line(stdout);
    if !stdout_line.is_empty() {
        return truncate_line(stdout_line, 200);
    }

    format!("exit code {exit_code}")
}

fn last_non_empty_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

fn truncate_line(line: &str, max_chars: usize) -> String {
    if line.chars().nth(max_chars).is_none() {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(max_chars - 3).collect();
        format!("{truncated}...")
    }
}
