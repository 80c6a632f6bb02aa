//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Backend (storage) error
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}
