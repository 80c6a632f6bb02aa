//! Request decorators.
//!
//! Each decorator wraps a [`SharedRequestor`](crate::SharedRequestor) and is a
//! [`Requestor`](crate::Requestor) itself, adding one cross-cutting behavior.

pub mod cache;
pub mod idempotent;
pub mod parallel;
pub mod retry;
pub mod timeout;

pub use cache::{CacheConfig, CacheKeyFn, CacheRequestor, default_cache_key};
pub use idempotent::{IdempotentConfig, IdempotentRequestor, RequestIdFn};
pub use parallel::{ParallelConfig, ParallelRequestor};
pub use retry::{DefaultRetryPolicy, RetryConfig, RetryPolicy, RetryRequestor};
pub use timeout::{TimeoutConfig, TimeoutRequestor};
