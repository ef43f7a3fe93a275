// ABOUTME: Idempotent, clonable shutdown signal used by every long-lived background task
// ABOUTME: Doubles as the caller-supplied cancellation token for Link read/write calls

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A close-once signal shared between a task's owner and the task itself.
///
/// Mirrors the `sync.Once` + `close(chan struct{})` idiom from the original
/// Go implementation, translated into tokio's async world: `close()` is the
/// `sync.Once`-guarded close, `notified()` is a receive on the closed
/// channel. Cloning shares the same underlying flag, so every clone observes
/// the same close exactly once.
#[derive(Clone, Debug)]
pub struct Shutdown {
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    /// Create a new, not-yet-closed signal.
    pub fn new() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Close the signal. Idempotent: the second and later calls are no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolve once the signal is closed. Resolves immediately if already closed.
    pub async fn notified(&self) {
        if self.is_closed() {
            return;
        }
        // `Notify::notified()` must be constructed before we re-check the
        // flag, otherwise a close() between the check above and this call
        // would be missed. `notify_waiters` wakes anyone already registered
        // at the time it's called, so the ordering here is safe: either we
        // observe `closed` directly above, or we register before the close
        // that eventually calls `notify_waiters`.
        let notified = self.notify.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
