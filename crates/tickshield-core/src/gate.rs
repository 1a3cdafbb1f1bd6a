//! Bounded-concurrency admission gate for upstream calls.
//!
//! The gate is the shared resource governing upstream access: at most
//! `capacity` calls are in flight at once. Waiters queue on the semaphore and
//! acquire in FIFO order, so no waiter starves as long as permits are
//! released. Release is tied to [`GatePermit`] drop, which makes it
//! unconditional on every exit path, cancellation unwind included.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::cancel::CancelToken;
use crate::outcome::FetchError;

/// Default number of simultaneous upstream calls.
pub const DEFAULT_GATE_CAPACITY: usize = 50;

/// Counting-semaphore gate bounding in-flight upstream calls.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held slot in the gate. Dropping the permit releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Acquire a slot, suspending while the gate is saturated.
    ///
    /// Returns [`FetchError::Cancelled`] if the token fires while queued;
    /// a cancelled waiter leaves the semaphore's permit count untouched.
    pub async fn acquire(&self, token: &CancelToken) -> Result<GatePermit, FetchError> {
        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            _ = token.cancelled() => Err(FetchError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                let permit = permit.expect("gate semaphore is never closed");
                Ok(GatePermit { _permit: permit })
            }
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots. Observational only; racing callers may consume
    /// the slot between the read and a subsequent acquire.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_CAPACITY)
    }
}
