//! Execution engine for the Gemini CLI: command construction, the invocation
//! driver, quota fallback, and the concurrency bound.

use std::sync::Arc;

use gmt_core::{EngineError, Invocation, InvocationRequest};
use tokio::sync::Semaphore;

pub mod command;
pub mod config;
pub mod context;
pub mod fallback;
pub mod output;
pub mod runner;

pub use config::{ChunkConfig, EngineConfig};
pub use context::InvocationContext;
pub use runner::{GeminiRunner, Runner};

/// Engine facade: one instance per server process.
///
/// Invocations run independently and concurrently, one child process each,
/// optionally bounded by `max_concurrent` slots.
pub struct Engine {
    config: EngineConfig,
    runner: GeminiRunner,
    slots: Option<Arc<Semaphore>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let slots = config
            .max_concurrent
            .map(|max| Arc::new(Semaphore::new(max.max(1))));
        Self {
            runner: GeminiRunner::new(config.clone()),
            config,
            slots,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one invocation end to end: slot acquisition, quota fallback, and
    /// progress-channel teardown on the single exit path.
    pub async fn invoke(
        &self,
        req: &InvocationRequest,
        ctx: &InvocationContext,
    ) -> Result<Invocation, EngineError> {
        let _permit = match &self.slots {
            Some(slots) => Some(
                slots
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| EngineError::Process("engine is shutting down".to_string()))?,
            ),
            None => None,
        };

        let result = fallback::invoke_with_fallback(&self.runner, &self.config, req, ctx).await;
        // No event may fire after resolution, regardless of how we got here.
        ctx.progress.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn engine_with_script(dir: &tempfile::TempDir, body: &str) -> Engine {
        let path = dir.path().join("gemini");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Engine::new(EngineConfig {
            executable: path.to_string_lossy().into_owned(),
            heartbeat_secs: 0,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_invoke_closes_progress_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_script(&dir, "echo done");
        let (ctx, mut rx) = InvocationContext::new();

        engine
            .invoke(&InvocationRequest::new("p"), &ctx)
            .await
            .unwrap();

        ctx.progress.emit("late event");
        // Drain anything emitted during the run; the post-close emit must not appear.
        let mut saw_late = false;
        while let Ok(event) = rx.try_recv() {
            saw_late |= event.message == "late event";
        }
        assert!(!saw_late, "progress channel not closed after resolution");
    }

    #[tokio::test]
    async fn test_invoke_closes_progress_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_script(&dir, "exit 1");
        let (ctx, mut rx) = InvocationContext::new();

        let err = engine
            .invoke(&InvocationRequest::new("p"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));

        ctx.progress.emit("late event");
        let mut saw_late = false;
        while let Ok(event) = rx.try_recv() {
            saw_late |= event.message == "late event";
        }
        assert!(!saw_late);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(engine_with_script(&dir, "echo \"run $$\""));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                let (ctx, _rx) = InvocationContext::new();
                engine.invoke(&InvocationRequest::new("p"), &ctx).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_slot_bound_respected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gemini");
        {
            // Each run sleeps briefly so overlapping runs would need two
            // slots. Close the write handle before anything executes it.
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh\nsleep 0.2\necho ok").unwrap();
        }
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = Arc::new(Engine::new(EngineConfig {
            executable: path.to_string_lossy().into_owned(),
            heartbeat_secs: 0,
            max_concurrent: Some(1),
            ..Default::default()
        }));

        let started = std::time::Instant::now();
        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                let (ctx, _rx) = InvocationContext::new();
                engine.invoke(&InvocationRequest::new("p"), &ctx).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        // Two 200ms runs through one slot cannot overlap.
        assert!(started.elapsed() >= std::time::Duration::from_millis(400));
    }
}
