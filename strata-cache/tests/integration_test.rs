//! Integration tests for strata-cache

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strata_cache::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u64,
    name: String,
}

#[tokio::test(start_paused = true)]
async fn test_store_behind_trait_object() {
    let store: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
    let profile = Profile { id: 7, name: "ada".into() };

    set(store.as_ref(), "profile:7", &profile, Some(Duration::from_secs(5)))
        .await
        .unwrap();
    let cached: Option<Profile> = get(store.as_ref(), "profile:7").await.unwrap();
    assert_eq!(cached, Some(profile));

    tokio::time::advance(Duration::from_secs(5)).await;
    let expired: Option<Profile> = get(store.as_ref(), "profile:7").await.unwrap();
    assert!(expired.is_none());
    assert!(!store.has("profile:7").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_remember_only_computes_on_miss() {
    let cache = InMemoryCache::new();
    let mut computed = 0;

    for _ in 0..3 {
        let value: u32 = remember(&cache, "answer", Some(Duration::from_secs(60)), || {
            computed += 1;
            async { Ok::<_, CacheError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }
    assert_eq!(computed, 1);
}

#[tokio::test]
async fn test_type_mismatch_is_a_deserialization_error() {
    let cache = InMemoryCache::new();
    set(&cache, "k", &"text", None).await.unwrap();

    let result: CacheResult<Option<u64>> = get(&cache, "k").await;
    assert!(matches!(result, Err(CacheError::Deserialization(_))));
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_and_clear() {
    let cache = InMemoryCache::new();
    cache.set_json("short", "1".into(), Some(Duration::from_millis(10))).await.unwrap();
    cache.set_json("long", "2".into(), Some(Duration::from_secs(10))).await.unwrap();
    cache.set_json("forever", "3".into(), None).await.unwrap();

    tokio::time::advance(Duration::from_millis(20)).await;
    assert_eq!(cache.cleanup_expired().await, 1);
    assert_eq!(cache.len().await, 2);
    assert_eq!(cache.ttl("forever").await.unwrap(), None);

    cache.delete("long").await.unwrap();
    assert_eq!(cache.len().await, 1);

    cache.clear().await.unwrap();
    assert!(cache.is_empty().await);
}

#[test]
fn test_cache_error_display() {
    let err = CacheError::Backend("connection refused".to_string());
    assert!(err.to_string().contains("connection refused"));
}
