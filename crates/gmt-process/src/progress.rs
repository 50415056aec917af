//! Per-invocation progress channel and heartbeat.
//!
//! Delivery is advisory: a dropped receiver or closed channel never affects
//! the invocation it describes.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use gmt_core::ProgressEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Ordered, best-effort event stream for one invocation.
///
/// Sequence numbers are assigned under the same lock that performs the send,
/// so receivers observe strictly increasing sequences even when the heartbeat
/// task and the invocation driver emit concurrently.
pub struct ProgressChannel {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    seq: Mutex<u64>,
    started: Instant,
    closed: AtomicBool,
}

impl ProgressChannel {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Arc<Self> {
        Arc::new(Self {
            tx,
            seq: Mutex::new(0),
            started: Instant::now(),
            closed: AtomicBool::new(false),
        })
    }

    /// Emit one event. No-op once the channel is closed.
    pub fn emit(&self, message: impl Into<String>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let event = {
            let mut seq = self.seq.lock().unwrap_or_else(|e| e.into_inner());
            let event = ProgressEvent {
                sequence: *seq,
                elapsed_ms: self.started.elapsed().as_millis() as u64,
                message: message.into(),
            };
            *seq += 1;
            if self.tx.send(event.clone()).is_err() {
                debug!("progress receiver dropped; event discarded");
            }
            event
        };
        debug!(sequence = event.sequence, elapsed_ms = event.elapsed_ms, "progress event");
    }

    /// Stop all future emission. Called on the invocation's single exit path;
    /// guarantees no event fires after the invocation resolved.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Time-based heartbeat attached to one in-flight invocation.
///
/// Emits an initial "starting" event synchronously, then one periodic event
/// per interval until stopped. Dropping the handle aborts the timer task, so
/// a pending tick can never outlive the invocation.
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    pub fn start(
        channel: Arc<ProgressChannel>,
        interval: Duration,
        initial: impl Into<String>,
        periodic: &'static str,
    ) -> Self {
        channel.emit(initial);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                channel.emit(periodic);
            }
        });

        Self { handle }
    }

    /// Stop the heartbeat explicitly. Equivalent to dropping the handle.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
