//! Cache store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value store with per-entry TTL.
///
/// Values are JSON strings; see [`crate::helpers`] for typed access.
///
/// An entry read after its TTL has elapsed must behave as absent. Stores
/// should evict such entries lazily on that read rather than relying on a
/// background sweep.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a JSON value from the cache.
    ///
    /// Returns `Ok(None)` if the key is missing or expired.
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a JSON value in the cache.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The JSON string value
    /// * `ttl` - Optional time-to-live; `None` never expires
    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Clear all keys from the cache.
    async fn clear(&self) -> CacheResult<()>;

    /// Check if a live (unexpired) key exists in the cache.
    async fn has(&self, key: &str) -> CacheResult<bool> {
        self.get_json(key).await.map(|v| v.is_some())
    }

    /// Get the remaining TTL of a key.
    ///
    /// Returns `Ok(None)` if the key has no expiration or doesn't exist.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;
}
