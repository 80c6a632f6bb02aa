// Strata - composable request decorators for Rust
//
// This library wraps any transport implementing `Requestor` with timeouts,
// retries, response caching, concurrency limits and in-flight deduplication.

// Re-export core functionality
pub use strata_core::*;

// Re-export building blocks
pub use strata_cache;
pub use strata_hash;

// Re-export optional crates
#[cfg(feature = "reqwest")]
pub use strata_reqwest;

#[cfg(feature = "reqwest")]
pub use strata_reqwest::{ReqwestConfig, ReqwestRequestor};

#[cfg(feature = "testing")]
pub use strata_testing;
