//! In-flight request deduplication.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use strata_hash::{DefaultHashService, HashService};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{RequestError, Result};
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Derives a request identity from method, URL, body and options.
pub type RequestIdFn =
    Arc<dyn Fn(&Method, &str, Option<&Payload>, &RequestOptions) -> String + Send + Sync>;

type SharedResponse = Shared<BoxFuture<'static, Result<Response>>>;

/// Idempotent (dedup) configuration.
#[derive(Clone)]
pub struct IdempotentConfig {
    /// Window during which identical requests are collapsed.
    pub dedupe_time: Duration,
    /// Hash service used by the default identity derivation.
    pub hash_service: Arc<dyn HashService>,
    /// Custom identity derivation; replaces hashing entirely when set.
    pub request_id: Option<RequestIdFn>,
}

impl Default for IdempotentConfig {
    fn default() -> Self {
        Self {
            dedupe_time: Duration::from_millis(1000),
            hash_service: Arc::new(DefaultHashService::new()),
            request_id: None,
        }
    }
}

impl fmt::Debug for IdempotentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotentConfig")
            .field("dedupe_time", &self.dedupe_time)
            .field("custom_request_id", &self.request_id.is_some())
            .finish_non_exhaustive()
    }
}

impl IdempotentConfig {
    /// Create a configuration with the given dedupe window.
    pub fn new(dedupe_time: Duration) -> Self {
        Self {
            dedupe_time,
            ..Default::default()
        }
    }

    /// Use a different hash service.
    pub fn with_hash_service(mut self, hash_service: Arc<dyn HashService>) -> Self {
        self.hash_service = hash_service;
        self
    }

    /// Override identity derivation.
    pub fn with_request_id<F>(mut self, request_id: F) -> Self
    where
        F: Fn(&Method, &str, Option<&Payload>, &RequestOptions) -> String + Send + Sync + 'static,
    {
        self.request_id = Some(Arc::new(request_id));
        self
    }
}

struct PendingRequest {
    generation: u64,
    future: SharedResponse,
    created_at: Instant,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingRequest>>>;

/// Collapses concurrent identical requests into one inner call.
///
/// Every call first evicts pending entries older than `dedupe_time`; this
/// sweep runs per call, never on a timer. A call whose identity matches a
/// live entry awaits that entry's shared future and receives a clone of the
/// same outcome, success or failure. Otherwise the call is registered before
/// it starts and removed as soon as it settles.
///
/// The inner call is spawned onto the runtime, so dropping every caller
/// does not abandon it: it still completes and clears its entry.
///
/// Identities are hashes, so two different requests that collide are merged.
/// The default SHA-256 identity makes that practically impossible; a weaker
/// [`HashService`] trades that guarantee away.
pub struct IdempotentRequestor {
    inner: SharedRequestor,
    config: IdempotentConfig,
    pending: PendingMap,
    generation: AtomicU64,
}

impl IdempotentRequestor {
    /// Wrap `inner` with request deduplication.
    pub fn new(inner: SharedRequestor, config: IdempotentConfig) -> Self {
        Self {
            inner,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Get the idempotent configuration.
    pub fn config(&self) -> &IdempotentConfig {
        &self.config
    }

    /// Number of requests currently registered as pending.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Derive the identity of a request.
    pub fn request_id(
        &self,
        method: &Method,
        url: &str,
        data: Option<&Payload>,
        options: &RequestOptions,
    ) -> String {
        if let Some(request_id) = &self.config.request_id {
            return request_id(method, url, data, options);
        }

        let options = (!options.is_empty()).then(|| options.to_value());
        self.config
            .hash_service
            .generate_request_hash(method.as_str(), url, data, options.as_ref())
    }

    fn start(
        &self,
        identity: &str,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> (u64, SharedResponse) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let pending = Arc::clone(&self.pending);
        let url = url.to_string();
        let key = identity.to_string();

        // The call runs on its own task so it settles, and releases whatever
        // it holds downstream, even after every caller has gone away.
        let task = tokio::spawn(async move {
            let result = inner.request(method, &url, data, options).await;

            // Settled: drop the entry unless a newer call took over the identity.
            let mut pending = pending.lock();
            if pending
                .get(&key)
                .is_some_and(|entry| entry.generation == generation)
            {
                pending.remove(&key);
            }
            result
        });

        let future = async move {
            task.await.unwrap_or_else(|e| {
                Err(RequestError::unknown(format!("Deduplicated request task failed: {e}")))
            })
        }
        .boxed()
        .shared();

        (generation, future)
    }
}

#[async_trait]
impl Requestor for IdempotentRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let identity = self.request_id(&method, url, data.as_ref(), &options);

        let future = {
            let mut pending = self.pending.lock();
            let now = Instant::now();
            let window = self.config.dedupe_time;
            pending.retain(|_, entry| now.duration_since(entry.created_at) <= window);

            if let Some(entry) = pending.get(&identity) {
                debug!(method = %method, url = %url, "Joining in-flight request");
                entry.future.clone()
            } else {
                let (generation, future) = self.start(&identity, method, url, data, options);
                pending.insert(
                    identity,
                    PendingRequest {
                        generation,
                        future: future.clone(),
                        created_at: now,
                    },
                );
                future
            }
        };

        future.await
    }
}
