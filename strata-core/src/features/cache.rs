//! GET response memoization.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strata_cache::{CacheStore, InMemoryCache};
use tracing::{debug, warn};

use crate::error::Result;
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Derives a cache key from a URL and its options.
pub type CacheKeyFn = Arc<dyn Fn(&str, &RequestOptions) -> String + Send + Sync>;

/// Default cache key: the URL followed by the JSON form of the options
/// (omitted when the options are empty).
pub fn default_cache_key(url: &str, options: &RequestOptions) -> String {
    if options.is_empty() {
        url.to_string()
    } else {
        format!("{}{}", url, options.to_json_string())
    }
}

/// Cache configuration.
#[derive(Clone)]
pub struct CacheConfig {
    /// Lifetime of a cached response.
    pub ttl: Duration,
    /// Backing store.
    pub store: Arc<dyn CacheStore>,
    /// Key derivation.
    pub key: CacheKeyFn,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            store: Arc::new(InMemoryCache::new()),
            key: Arc::new(default_cache_key),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CacheConfig {
    /// Create a configuration with the given TTL and an in-memory store.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// Use a different backing store.
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Override key derivation.
    pub fn with_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&str, &RequestOptions) -> String + Send + Sync + 'static,
    {
        self.key = Arc::new(key);
        self
    }
}

/// Memoizes GET responses.
///
/// Only GET is cached; every other method passes straight through and never
/// reads, populates or invalidates the cache. A hit returns the stored
/// response as-is with no revalidation. Concurrent misses for the same key
/// each reach the inner requestor; pair with the idempotent decorator for
/// single-flight behavior.
///
/// A failing store is logged and treated as a miss on read, and as a no-op
/// on write, so store trouble never replaces the transport's result.
pub struct CacheRequestor {
    inner: SharedRequestor,
    config: CacheConfig,
}

impl CacheRequestor {
    /// Wrap `inner` with a response cache.
    pub fn new(inner: SharedRequestor, config: CacheConfig) -> Self {
        Self { inner, config }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn lookup(&self, key: &str) -> Option<Response> {
        match strata_cache::get::<_, Response>(self.config.store.as_ref(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &Response) {
        let ttl = Some(self.config.ttl);
        if let Err(e) = strata_cache::set(self.config.store.as_ref(), key, response, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

#[async_trait]
impl Requestor for CacheRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        if method != Method::GET {
            return self.inner.request(method, url, data, options).await;
        }

        let key = (self.config.key)(url, &options);
        if let Some(cached) = self.lookup(&key).await {
            debug!(url = %url, "Cache hit");
            return Ok(cached);
        }

        debug!(url = %url, "Cache miss");
        let response = self.inner.request(method, url, data, options).await?;
        self.store(&key, &response).await;
        Ok(response)
    }
}
