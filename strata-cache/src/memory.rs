//! In-memory cache store.

use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory TTL cache.
///
/// Expired entries are evicted lazily when read; nothing is swept in the
/// background. [`InMemoryCache::cleanup_expired`] is available for callers
/// that want an explicit sweep.
#[derive(Clone)]
pub struct InMemoryCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the store holds no entries at all.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub async fn cleanup_expired(&self) -> usize {
        let mut data = self.data.write().await;
        let now = Instant::now();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        before - data.len()
    }

    async fn evict_if_expired(&self, key: &str) {
        let mut data = self.data.write().await;
        // Re-check under the write lock; a concurrent set may have refreshed it.
        if data
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            data.remove(key);
            tracing::trace!(key = %key, "Evicted expired cache entry");
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        {
            let data = self.data.read().await;
            match data.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        self.evict_if_expired(key).await;
        Ok(None)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let entry = CacheEntry { value, expires_at };
        self.data.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.clear();
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let data = self.data.read().await;
        let now = Instant::now();
        Ok(data
            .get(key)
            .and_then(|entry| entry.expires_at)
            .filter(|expires_at| *expires_at > now)
            .map(|expires_at| expires_at - now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = InMemoryCache::new();
        cache.set_json("a", "1".to_string(), None).await.unwrap();
        assert_eq!(cache.get_json("a").await.unwrap(), Some("1".to_string()));
        assert!(cache.has("a").await.unwrap());

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get_json("a").await.unwrap(), None);
        assert!(!cache.has("a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_absent_and_evicted_on_read() {
        let cache = InMemoryCache::new();
        cache
            .set_json("k", "v".to_string(), Some(Duration::from_millis(100)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get_json("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_millis(60)).await;
        // Still stored until something reads it.
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get_json("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_evicts_expired_entry() {
        let cache = InMemoryCache::new();
        cache
            .set_json("k", "v".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!cache.has("k").await.unwrap());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_reports_remaining_time() {
        let cache = InMemoryCache::new();
        cache
            .set_json("k", "v".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache.set_json("forever", "v".to_string(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.ttl("k").await.unwrap(), Some(Duration::from_secs(6)));
        assert_eq!(cache.ttl("forever").await.unwrap(), None);
        assert_eq!(cache.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let cache = InMemoryCache::new();
        cache
            .set_json("short", "v".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache.set_json("long", "v".to_string(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.has("long").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = InMemoryCache::new();
        cache.set_json("a", "1".to_string(), None).await.unwrap();
        cache.set_json("b", "2".to_string(), None).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }
}
