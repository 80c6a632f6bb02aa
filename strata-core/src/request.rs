//! Composition root.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{RequestError, Result};
use crate::features::{
    CacheConfig, CacheRequestor, IdempotentConfig, IdempotentRequestor, ParallelConfig,
    ParallelRequestor, RetryConfig, RetryRequestor, TimeoutConfig, TimeoutRequestor,
};
use crate::interceptor::{InterceptorManager, RequestContext};
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Which decorators to install. Absent sections are not installed.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Per-attempt deadline.
    pub timeout: Option<TimeoutConfig>,
    /// Retry policy.
    pub retry: Option<RetryConfig>,
    /// GET response cache.
    pub cache: Option<CacheConfig>,
    /// Concurrency limit.
    pub parallel: Option<ParallelConfig>,
    /// In-flight deduplication.
    pub idempotent: Option<IdempotentConfig>,
}

impl RequestConfig {
    /// Create a new configuration builder.
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::default()
    }
}

/// Builder for [`RequestConfig`].
#[derive(Debug, Default)]
pub struct RequestConfigBuilder {
    config: RequestConfig,
}

impl RequestConfigBuilder {
    /// Install the timeout decorator.
    pub fn timeout(mut self, config: TimeoutConfig) -> Self {
        self.config.timeout = Some(config);
        self
    }

    /// Install the retry decorator.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.config.retry = Some(config);
        self
    }

    /// Install the cache decorator.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.config.cache = Some(config);
        self
    }

    /// Install the concurrency limit decorator.
    pub fn parallel(mut self, config: ParallelConfig) -> Self {
        self.config.parallel = Some(config);
        self
    }

    /// Install the deduplication decorator.
    pub fn idempotent(mut self, config: IdempotentConfig) -> Self {
        self.config.idempotent = Some(config);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RequestConfig {
        self.config
    }
}

/// Wrap `base` with the configured decorators.
///
/// Decorators are applied in a fixed sequence, each wrapping the result of
/// the previous step: timeout, retry, cache, parallel, idempotent. The
/// resulting stack, outermost first, is therefore
///
/// ```text
/// idempotent -> parallel -> cache -> retry -> timeout -> base
/// ```
///
/// so every retry attempt gets its own deadline, a cache hit never enters
/// the retry loop, a concurrency slot covers one logical call including its
/// retries, and identical concurrent calls collapse before taking a slot.
pub fn compose(base: SharedRequestor, config: RequestConfig) -> SharedRequestor {
    let mut requestor = base;

    if let Some(timeout) = config.timeout {
        requestor = Arc::new(TimeoutRequestor::new(requestor, timeout));
    }
    if let Some(retry) = config.retry {
        requestor = Arc::new(RetryRequestor::new(requestor, retry));
    }
    if let Some(cache) = config.cache {
        requestor = Arc::new(CacheRequestor::new(requestor, cache));
    }
    if let Some(parallel) = config.parallel {
        requestor = Arc::new(ParallelRequestor::new(requestor, parallel));
    }
    if let Some(idempotent) = config.idempotent {
        requestor = Arc::new(IdempotentRequestor::new(requestor, idempotent));
    }

    requestor
}

/// Request facade: interceptors around a composed decorator stack.
///
/// ```rust,ignore
/// use strata_core::prelude::*;
/// use std::time::Duration;
///
/// let config = RequestConfig::builder()
///     .timeout(TimeoutConfig::new(Duration::from_secs(5)))
///     .retry(RetryConfig::default())
///     .idempotent(IdempotentConfig::default())
///     .build();
/// let client = Request::new(transport, config);
///
/// let user: User = client.get("/users/1", RequestOptions::new()).await?;
/// ```
#[derive(Clone)]
pub struct Request {
    requestor: SharedRequestor,
    interceptors: InterceptorManager,
}

impl Request {
    /// Compose `base` with the decorators named in `config`.
    pub fn new<R>(base: R, config: RequestConfig) -> Self
    where
        R: Requestor + 'static,
    {
        Self::from_shared(Arc::new(base), config)
    }

    /// Compose an already shared base requestor.
    pub fn from_shared(base: SharedRequestor, config: RequestConfig) -> Self {
        Self {
            requestor: compose(base, config),
            interceptors: InterceptorManager::new(),
        }
    }

    /// Interceptor chains applied around every call.
    pub fn interceptors(&self) -> &InterceptorManager {
        &self.interceptors
    }

    /// The composed decorator stack, without interceptors.
    pub fn requestor(&self) -> SharedRequestor {
        Arc::clone(&self.requestor)
    }

    /// Perform a request and return the full response.
    ///
    /// Request interceptors transform `options`, the decorator stack
    /// dispatches, and response interceptors transform the result. Failures
    /// are passed through the matching error hooks before being returned.
    pub async fn request_raw(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let context = RequestContext::new(&method, url, data.as_ref());
        let options = match self
            .interceptors
            .run_request_interceptors(&context, options)
            .await
        {
            Ok(options) => options,
            Err(e) => {
                let e = e.with_context(&method, url);
                return Err(self.interceptors.run_request_error_interceptors(e).await);
            }
        };

        let outcome = match self
            .requestor
            .request(method.clone(), url, data, options)
            .await
        {
            Ok(response) => self.interceptors.run_response_interceptors(response).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => Ok(response),
            Err(e) => {
                let e = e.with_context(&method, url);
                Err(self.interceptors.run_response_error_interceptors(e).await)
            }
        }
    }

    /// Perform a request and decode the response body.
    ///
    /// A body that fails to decode is reported as a `DECODE_ERROR` through
    /// the response error hooks, like any other post-dispatch failure.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.request_raw(method.clone(), url, data, options).await?;
        match response.into_json() {
            Ok(value) => Ok(value),
            Err(e) => {
                let e = e.with_context(&method, url);
                Err(self.interceptors.run_response_error_interceptors(e).await)
            }
        }
    }

    /// GET and decode.
    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::GET, url, None, options).await
    }

    /// POST a serializable body and decode.
    pub async fn post<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let data = encode(body)?;
        self.request(Method::POST, url, Some(data), options).await
    }

    /// PUT a serializable body and decode.
    pub async fn put<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let data = encode(body)?;
        self.request(Method::PUT, url, Some(data), options).await
    }

    /// DELETE and decode.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(Method::DELETE, url, None, options).await
    }

    /// PATCH a serializable body and decode.
    pub async fn patch<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let data = encode(body)?;
        self.request(Method::PATCH, url, Some(data), options).await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Payload> {
    serde_json::to_value(body).map_err(|e| {
        RequestError::unknown(format!("Failed to encode request body: {e}")).with_code("ENCODE_ERROR")
    })
}
