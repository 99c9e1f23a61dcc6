//! Pause switch between the detection queue and the courier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Controls whether detected files are dispatched.
///
/// The courier pauses the gate for the whole duration of one file's transfer.
/// Pausing hands out a [`PauseGuard`]; the gate reopens when the last guard
/// is dropped, on every exit path including unwinding.
#[derive(Debug, Clone, Default)]
pub struct DeliveryGate {
    inner: Arc<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    pauses: AtomicUsize,
    reopened: Notify,
}

impl DeliveryGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether dispatch is currently allowed.
    pub fn is_open(&self) -> bool {
        self.inner.pauses.load(Ordering::SeqCst) == 0
    }

    /// Suspends dispatch until the returned guard is dropped.
    #[must_use = "the gate reopens as soon as the guard is dropped"]
    pub fn pause(&self) -> PauseGuard {
        self.inner.pauses.fetch_add(1, Ordering::SeqCst);
        PauseGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Waits until the gate is open.
    pub async fn wait_open(&self) {
        loop {
            let reopened = self.inner.reopened.notified();
            tokio::pin!(reopened);
            reopened.as_mut().enable();

            if self.is_open() {
                return;
            }
            reopened.await;
        }
    }
}

/// Keeps a [`DeliveryGate`] paused while alive.
#[derive(Debug)]
pub struct PauseGuard {
    inner: Arc<GateInner>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        if self.inner.pauses.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.reopened.notify_waiters();
        }
    }
}
