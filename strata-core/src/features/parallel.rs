//! Concurrency limiting.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::{RequestError, Result};
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Parallel (concurrency limit) configuration.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Maximum number of simultaneous inner calls. Clamped to the range
    /// `1..=Semaphore::MAX_PERMITS`.
    pub max_concurrent: usize,
    /// Advisory only; waiting for a slot is not bounded.
    pub timeout: Duration,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ParallelConfig {
    /// Create a configuration with the given limit.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Default::default()
        }
    }
}

/// Bounds the number of simultaneous inner calls.
///
/// Callers beyond the limit wait in an unbounded FIFO queue. The slot is held
/// by a permit guard, so it is released when the call settles, fails or is
/// dropped, and each release wakes exactly one waiter in arrival order.
pub struct ParallelRequestor {
    inner: SharedRequestor,
    config: ParallelConfig,
    slots: Semaphore,
    capacity: usize,
    waiting: AtomicUsize,
}

struct WaitGuard<'a>(&'a AtomicUsize);

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ParallelRequestor {
    /// Wrap `inner` with a concurrency limit.
    pub fn new(inner: SharedRequestor, config: ParallelConfig) -> Self {
        let capacity = config.max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            inner,
            config,
            slots: Semaphore::new(capacity),
            capacity,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Get the parallel configuration.
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Number of inner calls currently running.
    pub fn running(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Number of free slots.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Number of callers waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Requestor for ParallelRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let _permit = {
            let _waiting = WaitGuard::enter(&self.waiting);
            self.slots
                .acquire()
                .await
                .map_err(|_| RequestError::unknown("Concurrency limiter closed"))?
        };
        trace!(
            method = %method,
            url = %url,
            running = self.running(),
            "Acquired concurrency slot"
        );

        self.inner.request(method, url, data, options).await
    }
}
