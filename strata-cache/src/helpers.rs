//! Helper functions for typed cache access.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Get a typed value from the cache.
pub async fn get<S, T>(store: &S, key: &str) -> CacheResult<Option<T>>
where
    S: CacheStore + ?Sized,
    T: DeserializeOwned,
{
    if let Some(json) = store.get_json(key).await? {
        let value: T = serde_json::from_str(&json)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(Some(value))
    } else {
        Ok(None)
    }
}

/// Set a typed value in the cache.
pub async fn set<S, T>(store: &S, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
where
    S: CacheStore + ?Sized,
    T: Serialize,
{
    let json =
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set_json(key, json, ttl).await
}

/// Remember a value for a given duration.
///
/// If the key exists, returns the cached value.
/// If not, calls the factory function, caches the result, and returns it.
/// Factory errors are returned as-is and nothing is cached.
pub async fn remember<S, T, E, F, Fut>(
    store: &S,
    key: &str,
    ttl: Option<Duration>,
    factory: F,
) -> Result<T, E>
where
    S: CacheStore + ?Sized,
    T: Serialize + DeserializeOwned,
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    if let Some(value) = get(store, key).await? {
        return Ok(value);
    }

    let value = factory().await?;
    set(store, key, &value, ttl).await?;
    Ok(value)
}
