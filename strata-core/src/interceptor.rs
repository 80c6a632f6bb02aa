//! Request and response interceptors.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{RequestError, Result};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Read-only view of the request an interceptor is preparing.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// HTTP method.
    pub method: &'a Method,
    /// Target URL.
    pub url: &'a str,
    /// Request body, if any.
    pub data: Option<&'a Payload>,
}

impl<'a> RequestContext<'a> {
    /// Describe a request.
    pub fn new(method: &'a Method, url: &'a str, data: Option<&'a Payload>) -> Self {
        Self { method, url, data }
    }
}

/// Transforms request options before dispatch.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Intercept and optionally modify the options of `request`.
    async fn on_request(
        &self,
        _request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        Ok(options)
    }

    /// Observe or rewrite an error raised while preparing the request.
    async fn on_request_error(&self, error: RequestError) -> RequestError {
        error
    }
}

/// Transforms responses after dispatch.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Intercept and optionally modify the response.
    async fn on_response(&self, response: Response) -> Result<Response> {
        Ok(response)
    }

    /// Observe or rewrite an error raised by the requestor chain.
    async fn on_response_error(&self, error: RequestError) -> RequestError {
        error
    }
}

/// Request interceptor built from a synchronous closure.
pub struct FnRequestInterceptor<F>(F);

/// Wrap a closure as a [`RequestInterceptor`].
pub fn request_fn<F>(f: F) -> FnRequestInterceptor<F>
where
    F: Fn(RequestOptions) -> RequestOptions + Send + Sync,
{
    FnRequestInterceptor(f)
}

#[async_trait]
impl<F> RequestInterceptor for FnRequestInterceptor<F>
where
    F: Fn(RequestOptions) -> RequestOptions + Send + Sync,
{
    async fn on_request(
        &self,
        _request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        Ok((self.0)(options))
    }
}

/// Response interceptor built from a synchronous closure.
pub struct FnResponseInterceptor<F>(F);

/// Wrap a closure as a [`ResponseInterceptor`].
pub fn response_fn<F>(f: F) -> FnResponseInterceptor<F>
where
    F: Fn(Response) -> Response + Send + Sync,
{
    FnResponseInterceptor(f)
}

#[async_trait]
impl<F> ResponseInterceptor for FnResponseInterceptor<F>
where
    F: Fn(Response) -> Response + Send + Sync,
{
    async fn on_response(&self, response: Response) -> Result<Response> {
        Ok((self.0)(response))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    Request,
    Response,
}

type Entries<T> = RwLock<Vec<(u64, Arc<T>)>>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    request: Entries<dyn RequestInterceptor>,
    response: Entries<dyn ResponseInterceptor>,
}

impl Registry {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Ordered chains of request and response interceptors.
///
/// Interceptors run strictly in registration order, each one receiving the
/// output of the previous. A chain is snapshotted before it runs, so
/// registering or removing interceptors concurrently never reorders a run
/// in progress.
///
/// Cloning the manager yields another handle to the same chains.
#[derive(Clone, Default)]
pub struct InterceptorManager {
    registry: Arc<Registry>,
}

/// Deregistration capability returned when an interceptor is added.
///
/// Removal is by registration identity, not by position. Dropping the
/// handle leaves the interceptor installed.
#[derive(Debug)]
#[must_use = "dropping the handle keeps the interceptor registered; call `remove` to deregister"]
pub struct InterceptorHandle {
    registry: Weak<Registry>,
    chain: Chain,
    id: u64,
}

impl InterceptorHandle {
    /// Remove exactly the interceptor this handle was issued for.
    ///
    /// Returns `false` if it was already removed or the manager is gone.
    pub fn remove(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        match self.chain {
            Chain::Request => remove_entry(&registry.request, self.id),
            Chain::Response => remove_entry(&registry.response, self.id),
        }
    }
}

fn remove_entry<T: ?Sized>(entries: &Entries<T>, id: u64) -> bool {
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|(entry_id, _)| *entry_id != id);
    entries.len() != before
}

fn snapshot<T: ?Sized>(entries: &Entries<T>) -> Vec<Arc<T>> {
    entries.read().iter().map(|(_, i)| Arc::clone(i)).collect()
}

impl InterceptorManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request interceptor.
    pub fn add_request_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: RequestInterceptor + 'static,
    {
        self.add_shared_request_interceptor(Arc::new(interceptor))
    }

    /// Append an already shared request interceptor.
    pub fn add_shared_request_interceptor(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> InterceptorHandle {
        let id = self.registry.next_id();
        self.registry.request.write().push((id, interceptor));
        self.handle(Chain::Request, id)
    }

    /// Append a response interceptor.
    pub fn add_response_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: ResponseInterceptor + 'static,
    {
        self.add_shared_response_interceptor(Arc::new(interceptor))
    }

    /// Append an already shared response interceptor.
    pub fn add_shared_response_interceptor(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> InterceptorHandle {
        let id = self.registry.next_id();
        self.registry.response.write().push((id, interceptor));
        self.handle(Chain::Response, id)
    }

    fn handle(&self, chain: Chain, id: u64) -> InterceptorHandle {
        InterceptorHandle {
            registry: Arc::downgrade(&self.registry),
            chain,
            id,
        }
    }

    /// Number of registered request interceptors.
    pub fn request_count(&self) -> usize {
        self.registry.request.read().len()
    }

    /// Number of registered response interceptors.
    pub fn response_count(&self) -> usize {
        self.registry.response.read().len()
    }

    /// Remove every interceptor.
    pub fn clear(&self) {
        self.registry.request.write().clear();
        self.registry.response.write().clear();
    }

    /// Thread options through every request interceptor.
    pub async fn run_request_interceptors(
        &self,
        request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        let mut current = options;
        for interceptor in snapshot(&self.registry.request) {
            current = interceptor.on_request(request, current).await?;
        }
        Ok(current)
    }

    /// Thread a response through every response interceptor.
    pub async fn run_response_interceptors(&self, response: Response) -> Result<Response> {
        let mut current = response;
        for interceptor in snapshot(&self.registry.response) {
            current = interceptor.on_response(current).await?;
        }
        Ok(current)
    }

    /// Thread an error through every request interceptor's error hook.
    pub async fn run_request_error_interceptors(&self, error: RequestError) -> RequestError {
        let mut current = error;
        for interceptor in snapshot(&self.registry.request) {
            current = interceptor.on_request_error(current).await;
        }
        current
    }

    /// Thread an error through every response interceptor's error hook.
    pub async fn run_response_error_interceptors(&self, error: RequestError) -> RequestError {
        let mut current = error;
        for interceptor in snapshot(&self.registry.response) {
            current = interceptor.on_response_error(current).await;
        }
        current
    }
}

/// Logging interceptor that logs requests, responses and errors.
pub struct LoggingInterceptor {
    log_headers: bool,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor.
    pub fn new() -> Self {
        Self { log_headers: false }
    }

    /// Enable logging of headers.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request(
        &self,
        request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            headers = options.headers.len(),
            timeout = ?options.timeout,
            "Dispatching request"
        );

        if self.log_headers {
            for (name, value) in &options.headers {
                tracing::trace!(header = %name, value = %value, "Request header");
            }
        }

        Ok(options)
    }

    async fn on_request_error(&self, error: RequestError) -> RequestError {
        tracing::warn!(error = %error.describe(), "Request preparation failed");
        error
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn on_response(&self, response: Response) -> Result<Response> {
        tracing::debug!(status = response.status, "Received response");

        if self.log_headers {
            for (name, value) in &response.headers {
                tracing::trace!(header = %name, value = %value, "Response header");
            }
        }

        Ok(response)
    }

    async fn on_response_error(&self, error: RequestError) -> RequestError {
        tracing::warn!(error = %error.describe(), "Request failed");
        error
    }
}

/// Authentication interceptor that adds auth headers.
pub struct AuthInterceptor {
    auth_type: AuthType,
}

enum AuthType {
    Bearer(String),
    Basic { username: String, password: String },
    ApiKey { header: String, key: String },
}

impl AuthInterceptor {
    /// Create a bearer token interceptor.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer(token.into()),
        }
    }

    /// Create a basic auth interceptor.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Basic {
                username: username.into(),
                password: password.into(),
            },
        }
    }

    /// Create an API key interceptor.
    pub fn api_key(header: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::ApiKey {
                header: header.into(),
                key: key.into(),
            },
        }
    }
}

#[async_trait]
impl RequestInterceptor for AuthInterceptor {
    async fn on_request(
        &self,
        _request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        let options = match &self.auth_type {
            AuthType::Bearer(token) => options.bearer_auth(token),
            AuthType::Basic { username, password } => {
                use base64::Engine;
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                options.header("Authorization", format!("Basic {}", credentials))
            }
            AuthType::ApiKey { header, key } => options.header(header.clone(), key.clone()),
        };
        Ok(options)
    }
}
