//! The invocation driver: spawn, wait, classify.

use async_trait::async_trait;
use gmt_core::models::{self, status};
use gmt_core::{EngineError, Invocation, InvocationRequest};
use gmt_process::{Heartbeat, spawn_tool, terminate, wait_and_capture};
use tracing::{debug, info};

use crate::command::build_command;
use crate::config::EngineConfig;
use crate::context::InvocationContext;
use crate::output::aggregate_output;

/// Seam between the quota-fallback controller and the process layer.
///
/// The production implementation drives the Gemini CLI; tests substitute
/// scripted outcomes.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(
        &self,
        req: &InvocationRequest,
        model: &str,
        ctx: &InvocationContext,
    ) -> Result<Invocation, EngineError>;
}

pub struct GeminiRunner {
    config: EngineConfig,
}

impl GeminiRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Runner for GeminiRunner {
    /// One attempt against one model: validate, spawn, wait, classify.
    ///
    /// No internal deadline is ever imposed; large-codebase invocations run
    /// for minutes and liveness comes from the heartbeat. Cancellation and an
    /// optional caller-supplied timeout both kill the whole process group.
    async fn run(
        &self,
        req: &InvocationRequest,
        model: &str,
        ctx: &InvocationContext,
    ) -> Result<Invocation, EngineError> {
        req.validate()?;

        if req.sandbox {
            ctx.progress.emit(status::SANDBOX_EXECUTING);
        }

        // Heartbeat lives for exactly this attempt; dropped on every return
        // path below, which aborts the timer task.
        let _heartbeat = self.config.heartbeat_interval().map(|interval| {
            Heartbeat::start(
                ctx.progress.clone(),
                interval,
                status::STARTING,
                status::STILL_PROCESSING,
            )
        });

        let cmd = build_command(&self.config, req, model);
        debug!(model, sandbox = req.sandbox, "spawning gemini CLI");
        let mut child = spawn_tool(cmd).map_err(|e| EngineError::Process(format!("{e:#}")))?;

        let result = tokio::select! {
            result = wait_and_capture(&mut child) => {
                result.map_err(|e| EngineError::Process(format!("{e:#}")))?
            }
            () = ctx.cancel.cancelled() => {
                info!(model, "invocation cancelled; terminating child process group");
                terminate(&mut child).await;
                return Err(EngineError::Cancelled);
            }
            () = optional_deadline(req.timeout) => {
                let elapsed_secs = req.timeout.map(|d| d.as_secs()).unwrap_or_default();
                info!(model, elapsed_secs, "caller timeout elapsed; terminating child");
                terminate(&mut child).await;
                return Err(EngineError::Timeout { elapsed_secs });
            }
        };

        if !result.success() {
            let diagnostic = result.diagnostic();
            if diagnostic.contains(models::QUOTA_EXCEEDED_SIGNATURE) {
                return Err(EngineError::QuotaExceeded {
                    model: model.to_string(),
                    message: diagnostic,
                });
            }
            return Err(EngineError::Process(diagnostic));
        }

        let text = aggregate_output(req.output_format, &result.output);
        if text.trim().is_empty() {
            return Err(EngineError::Process(
                "Gemini CLI exited successfully but produced no output".to_string(),
            ));
        }

        Ok(Invocation {
            text,
            model: model.to_string(),
            used_fallback: false,
        })
    }
}

/// Pending forever when the caller configured no timeout.
async fn optional_deadline(timeout: Option<std::time::Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
