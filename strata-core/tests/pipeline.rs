//! End-to-end behavior of composed stacks behind the `Request` facade.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strata_core::*;
use strata_testing::*;
use tokio::time::Instant;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn trail(name: &'static str) -> impl Fn(RequestOptions) -> RequestOptions + Send + Sync {
    move |options| {
        let trail = options
            .headers
            .get("x-trail")
            .map(|t| format!("{t},{name}"))
            .unwrap_or_else(|| name.to_string());
        options.header("x-trail", trail)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct NewUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Echo {
    method: String,
    url: String,
    data: Option<NewUser>,
    call: usize,
}

// ========== Composition ==========

#[tokio::test(start_paused = true)]
async fn timeout_applies_to_each_retry_attempt() {
    init_tracing();
    let mock = MockRequestor::new().with_fallback(MockOutcome::Hang);
    let config = RequestConfig::builder()
        .timeout(TimeoutConfig::new(Duration::from_millis(100)))
        .retry(RetryConfig::new(2, Duration::from_millis(50)))
        .build();
    let client = Request::new(mock.clone(), config);

    let start = Instant::now();
    let err = client
        .get::<Value>("/hang", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.retry_count(), Some(2));
    assert_eq!(err.method(), Some(&Method::GET));
    assert_call_count(&mock, 3);
    assert!(mock.calls().iter().all(RecordedCall::signal_cancelled));
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn cache_hit_bypasses_retry_and_transport() {
    let mock = MockRequestor::new();
    mock.push(MockOutcome::fail(RequestError::network("connection reset")));
    let config = RequestConfig::builder()
        .retry(RetryConfig::immediate(3))
        .cache(CacheConfig::default())
        .build();
    let client = Request::new(mock.clone(), config);

    let first: Value = client.get("/profile", RequestOptions::new()).await.unwrap();
    assert_call_count(&mock, 2);

    let second: Value = client.get("/profile", RequestOptions::new()).await.unwrap();
    assert_call_count(&mock, 2);
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn dedup_collapses_before_taking_a_slot() {
    let mock = MockRequestor::new().with_latency(Duration::from_millis(100));
    let config = RequestConfig::builder()
        .parallel(ParallelConfig::new(1))
        .idempotent(IdempotentConfig::default())
        .build();
    let client = Request::new(mock.clone(), config);

    let start = Instant::now();
    let same = (0..4).map(|_| client.get::<Value>("/feed", RequestOptions::new()));
    let (same, other) = tokio::join!(
        join_all(same),
        client.get::<Value>("/other", RequestOptions::new())
    );

    assert!(same.iter().all(|r| r.is_ok()) && other.is_ok());
    assert_call_count(&mock, 2);
    assert_max_concurrency(&mock, 1);
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn abandoned_dedup_call_still_releases_its_slot() {
    let mock = MockRequestor::new().with_latency(Duration::from_millis(100));
    let config = RequestConfig::builder()
        .parallel(ParallelConfig::new(1))
        .idempotent(IdempotentConfig::default())
        .build();
    let client = Request::new(mock.clone(), config);

    let gave_up = tokio::time::timeout(
        Duration::from_millis(10),
        client.get::<Value>("/a", RequestOptions::new()),
    )
    .await;
    assert!(gave_up.is_err());

    let next = tokio::time::timeout(
        Duration::from_secs(5),
        client.get::<Value>("/b", RequestOptions::new()),
    )
    .await;

    assert!(matches!(next, Ok(Ok(_))));
    assert_call_count(&mock, 2);
    assert_max_concurrency(&mock, 1);
}

#[tokio::test(start_paused = true)]
async fn full_stack_round_trip() {
    let mock = MockRequestor::new();
    let config = RequestConfig::builder()
        .timeout(TimeoutConfig::default())
        .retry(RetryConfig::default())
        .cache(CacheConfig::default())
        .parallel(ParallelConfig::default())
        .idempotent(IdempotentConfig::default())
        .build();
    let client = Request::new(mock.clone(), config);

    let body = NewUser { name: "ada".into() };
    let echo: Echo = client.post("/users", &body, RequestOptions::new()).await.unwrap();

    assert_eq!(echo.method, "POST");
    assert_eq!(echo.url, "/users");
    assert_eq!(echo.data, Some(body));
    assert_eq!(echo.call, 1);
}

#[tokio::test(start_paused = true)]
async fn settings_drive_composition() {
    let settings = RequestSettings::from_toml_str(
        r#"
        [retry]
        max_retries = 1
        retry_delay_ms = 0
        "#,
    )
    .unwrap();
    let mock = MockRequestor::new()
        .with_fallback(MockOutcome::fail(RequestError::http(502, "Bad Gateway")));
    let client = Request::new(mock.clone(), settings.into_config());

    let err = client
        .delete::<Value>("/thing", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.retry_count(), Some(1));
    assert_call_count(&mock, 2);
}

// ========== Interceptors ==========

#[tokio::test]
async fn request_interceptors_apply_in_registration_order() {
    let mock = MockRequestor::new();
    let client = Request::new(mock.clone(), RequestConfig::default());
    let _a = client.interceptors().add_request_interceptor(request_fn(trail("A")));
    let _b = client.interceptors().add_request_interceptor(request_fn(trail("B")));

    client
        .get::<Value>("/ordered", RequestOptions::new())
        .await
        .unwrap();

    let call = mock.last_call().unwrap();
    assert_eq!(call.options.headers.get("x-trail").map(String::as_str), Some("A,B"));
}

#[tokio::test]
async fn removed_interceptor_no_longer_runs() {
    let mock = MockRequestor::new();
    let client = Request::new(mock.clone(), RequestConfig::default());
    let a = client.interceptors().add_request_interceptor(request_fn(trail("A")));
    let _b = client.interceptors().add_request_interceptor(request_fn(trail("B")));

    assert!(a.remove());
    client.get::<Value>("/x", RequestOptions::new()).await.unwrap();

    let call = mock.last_call().unwrap();
    assert_eq!(call.options.headers.get("x-trail").map(String::as_str), Some("B"));
    assert_eq!(client.interceptors().request_count(), 1);
}

#[tokio::test]
async fn response_interceptors_transform_decoded_value() {
    let mock = MockRequestor::new();
    mock.push(MockOutcome::respond(json!({"count": 1})));
    let client = Request::new(mock.clone(), RequestConfig::default());
    let _wrap = client.interceptors().add_response_interceptor(response_fn(|r: Response| {
        r.map_data(|d| d["count"].clone())
    }));

    let count: u32 = client.get("/count", RequestOptions::new()).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn auth_interceptor_reaches_transport() {
    let mock = MockRequestor::new();
    let client = Request::new(mock.clone(), RequestConfig::default());
    let _auth = client
        .interceptors()
        .add_request_interceptor(AuthInterceptor::bearer("secret"));
    let _log = client
        .interceptors()
        .add_request_interceptor(LoggingInterceptor::new().with_headers());

    client.get::<Value>("/me", RequestOptions::new()).await.unwrap();

    let call = mock.last_call().unwrap();
    assert_eq!(
        call.options.headers.get("Authorization").map(String::as_str),
        Some("Bearer secret")
    );
}

#[derive(Default)]
struct Hooks {
    request_errors: AtomicUsize,
    response_errors: AtomicUsize,
}

#[async_trait]
impl RequestInterceptor for Hooks {
    async fn on_request_error(&self, error: RequestError) -> RequestError {
        self.request_errors.fetch_add(1, Ordering::SeqCst);
        error
    }
}

#[async_trait]
impl ResponseInterceptor for Hooks {
    async fn on_response_error(&self, error: RequestError) -> RequestError {
        self.response_errors.fetch_add(1, Ordering::SeqCst);
        error.with_code("UPSTREAM_FAILED")
    }
}

struct Reject;

#[async_trait]
impl RequestInterceptor for Reject {
    async fn on_request(
        &self,
        _request: &RequestContext<'_>,
        _options: RequestOptions,
    ) -> Result<RequestOptions> {
        Err(RequestError::unknown("missing credentials"))
    }
}

#[tokio::test]
async fn response_error_hook_sees_transport_failures() {
    let mock = MockRequestor::new();
    mock.push(MockOutcome::fail(RequestError::http(500, "Internal Server Error")));
    let client = Request::new(mock.clone(), RequestConfig::default());
    let hooks = Arc::new(Hooks::default());
    let _res = client.interceptors().add_shared_response_interceptor(hooks.clone());

    let err = client
        .get::<Value>("/broken", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("UPSTREAM_FAILED"));
    assert_eq!(err.url(), Some("/broken"));
    assert_eq!(hooks.response_errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_error_hook_sees_interceptor_failures() {
    let mock = MockRequestor::new();
    let client = Request::new(mock.clone(), RequestConfig::default());
    let hooks = Arc::new(Hooks::default());
    let _req = client.interceptors().add_shared_request_interceptor(hooks.clone());
    let _reject = client.interceptors().add_request_interceptor(Reject);

    let err = client
        .get::<Value>("/private", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.message(), "missing credentials");
    assert_eq!(err.method(), Some(&Method::GET));
    assert_eq!(hooks.request_errors.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.response_errors.load(Ordering::SeqCst), 0);
    assert_call_count(&mock, 0);
}

#[tokio::test]
async fn decode_failure_carries_context() {
    let mock = MockRequestor::new();
    mock.push(MockOutcome::respond("not a number"));
    let client = Request::new(mock, RequestConfig::default());

    let err = client
        .get::<u32>("/number", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("DECODE_ERROR"));
    assert_eq!(err.url(), Some("/number"));
}

#[tokio::test]
async fn decode_failure_reaches_response_error_hook() {
    let mock = MockRequestor::new();
    mock.push(MockOutcome::respond("not a number"));
    let client = Request::new(mock, RequestConfig::default());
    let hooks = Arc::new(Hooks::default());
    let _res = client.interceptors().add_shared_response_interceptor(hooks.clone());

    let err = client
        .get::<u32>("/number", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("UPSTREAM_FAILED"));
    assert_eq!(err.method(), Some(&Method::GET));
    assert_eq!(hooks.response_errors.load(Ordering::SeqCst), 1);
}

struct TagWrites;

#[async_trait]
impl RequestInterceptor for TagWrites {
    async fn on_request(
        &self,
        request: &RequestContext<'_>,
        options: RequestOptions,
    ) -> Result<RequestOptions> {
        if request.data.is_some() && request.url.starts_with("/users") {
            return Ok(options.header("x-write", request.method.as_str()));
        }
        Ok(options)
    }
}

#[tokio::test]
async fn request_interceptor_branches_on_url_and_body() {
    let mock = MockRequestor::new();
    let client = Request::new(mock.clone(), RequestConfig::default());
    let _tag = client.interceptors().add_request_interceptor(TagWrites);
    let _log = client.interceptors().add_request_interceptor(LoggingInterceptor::new());

    let user = NewUser {
        name: "ada".into(),
    };
    client
        .post::<Value, _>("/users", &user, RequestOptions::new())
        .await
        .unwrap();
    client.get::<Value>("/users/1", RequestOptions::new()).await.unwrap();
    client
        .post::<Value, _>("/jobs", &user, RequestOptions::new())
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(
        calls[0].options.headers.get("x-write").map(String::as_str),
        Some("POST")
    );
    assert!(calls[1].options.headers.get("x-write").is_none());
    assert!(calls[2].options.headers.get("x-write").is_none());
}
