//! Cooperative cancellation signal.
//!
//! Every suspension point in the call path (gate wait, backoff sleep, network
//! call) races a [`CancelToken`] via `tokio::select!`. Cancellation unwinds
//! promptly and surfaces as its own outcome category, never as a retryable
//! failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Clonable cancellation handle shared between a caller and in-flight fetches.
///
/// Clones observe the same underlying flag; cancelling any clone cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every task waiting on [`cancelled`].
    ///
    /// [`cancelled`]: Self::cancelled
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token is cancelled. Safe to race in `select!` arms.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }

            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before the re-check so a concurrent cancel() between
            // the check and the await cannot be missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
