//! Per-invocation context: progress channel plus cancellation token.
//!
//! Owned by the call that created it and passed by reference down the stack;
//! torn down on the invocation's single exit path.

use std::sync::Arc;

use gmt_core::ProgressEvent;
use gmt_process::ProgressChannel;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct InvocationContext {
    pub progress: Arc<ProgressChannel>,
    pub cancel: CancellationToken,
}

impl InvocationContext {
    /// Build a context and hand back the receiving end of its progress stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                progress: ProgressChannel::new(tx),
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_delivers_progress() {
        let (ctx, mut rx) = InvocationContext::new();
        ctx.progress.emit("hello");
        assert_eq!(rx.recv().await.unwrap().message, "hello");
        assert!(!ctx.cancel.is_cancelled());
    }
}
