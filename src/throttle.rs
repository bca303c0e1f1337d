//! Global cap on in-flight API requests
//!
//! The [`ThrottleGate`] hands out at most `max_concurrent` permits at a time.
//! Callers beyond the cap wait in a FIFO queue and are admitted strictly in
//! arrival order as permits are released. There is no deadline on waiting.
//!
//! The gate is backed by a fair `tokio::sync::Semaphore`, so its counter and
//! queue are safe to share across tasks on a multi-threaded runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds the number of concurrent outbound requests
///
/// Cloning is cheap; clones share the same permits and wait queue.
#[derive(Clone, Debug)]
pub struct ThrottleGate {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Returned by [`ThrottleGate::acquire`] once the gate has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("throttle gate is closed")]
pub struct GateClosed;

/// The right to perform one in-flight request
///
/// The slot is freed when the permit is released or dropped, whichever comes
/// first, and the next waiter (if any) is admitted.
#[derive(Debug)]
#[must_use = "a permit releases its slot as soon as it is dropped"]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl ThrottleGate {
    /// Create a gate admitting at most `max_concurrent` callers at once
    ///
    /// A value of 0 is treated as 1 so that the gate can never deadlock.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    ///
    /// Returns immediately while fewer than `max_concurrent` permits are out;
    /// otherwise suspends until a permit is released. Fails once the gate is
    /// closed, including for callers already waiting.
    pub async fn acquire(&self) -> Result<Permit, GateClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| {
                tracing::warn!(max = self.max_concurrent, "throttle gate closed, request not sent");
                GateClosed
            })?;
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(in_flight, max = self.max_concurrent, "throttle permit acquired");
        Ok(Permit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stop admitting callers
    ///
    /// Permits already granted stay valid until released; every pending and
    /// future `acquire` fails with [`GateClosed`].
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Release a permit, admitting the next waiter
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    /// Number of permits currently granted
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Maximum number of permits granted at once
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
