//! Global admission gate in front of the upstream.
//!
//! Backed by a fair [`tokio::sync::Semaphore`]: waiters are granted permits
//! strictly in the order they started waiting. There is no bound on the
//! wait queue and no timeout for queued tasks.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

pub struct ConcurrencyLimiter {
    slots: Semaphore,
    capacity: usize,
    queued: AtomicUsize,
}

/// Decrements the queued counter even if the waiting future is dropped.
struct QueuedGuard<'a>(&'a AtomicUsize);

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Semaphore::new(capacity),
            capacity,
            queued: AtomicUsize::new(0),
        }
    }

    /// Run `task` once an admission slot is free and return its output.
    ///
    /// The slot is held until `task` resolves, whatever it resolves to.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let permit = {
            self.queued.fetch_add(1, Ordering::SeqCst);
            let _waiting = QueuedGuard(&self.queued);
            self.slots
                .acquire()
                .await
                .expect("limiter semaphore is never closed")
        };
        tracing::trace!(
            running = self.running(),
            queued = self.queued(),
            "Admission slot acquired"
        );

        let output = task.await;
        drop(permit);
        output
    }

    /// Tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}
