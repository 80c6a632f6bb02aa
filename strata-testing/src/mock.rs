// Mock transport for testing

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strata_core::{
    Method, Payload, RequestError, RequestOptions, Requestor, Response, Result,
};
use tokio::time::Instant;

/// What a [`MockRequestor`] does with a call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Resolve with this response.
    Respond(Response),
    /// Reject with this error.
    Fail(RequestError),
    /// Never settle unless the call's signal is cancelled.
    Hang,
    /// Resolve with `{"method", "url", "data", "call"}` describing the call.
    Echo,
}

impl MockOutcome {
    /// Respond with a 200 carrying `data`.
    pub fn respond(data: impl Into<Payload>) -> Self {
        Self::Respond(Response::new(data))
    }

    /// Fail with `error`.
    pub fn fail(error: RequestError) -> Self {
        Self::Fail(error)
    }
}

/// A call observed by a [`MockRequestor`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// 1-based call number.
    pub call: usize,
    pub method: Method,
    pub url: String,
    pub data: Option<Payload>,
    pub options: RequestOptions,
    /// When the call reached the mock.
    pub started_at: Instant,
}

impl RecordedCall {
    /// Whether the signal handed to this call has been cancelled.
    pub fn signal_cancelled(&self) -> bool {
        self.options
            .signal
            .as_ref()
            .is_some_and(|signal| signal.is_cancelled())
    }
}

struct MockState {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: Mutex<MockOutcome>,
    latency: Mutex<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Scriptable in-memory [`Requestor`].
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// call gets the fallback outcome, which defaults to [`MockOutcome::Echo`].
/// Clones share state.
#[derive(Clone)]
pub struct MockRequestor {
    state: Arc<MockState>,
}

impl MockRequestor {
    /// Create a mock that echoes every call.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(MockOutcome::Echo),
                latency: Mutex::new(Duration::ZERO),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Delay every call by `latency` before settling.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.state.latency.lock() = latency;
        self
    }

    /// Outcome used once the script is exhausted.
    pub fn with_fallback(self, outcome: MockOutcome) -> Self {
        *self.state.fallback.lock() = outcome;
        self
    }

    /// Append an outcome to the script.
    pub fn push(&self, outcome: MockOutcome) {
        self.state.script.lock().push_back(outcome);
    }

    /// Get the number of calls received
    pub fn call_count(&self) -> usize {
        self.state.calls.lock().len()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    /// Get the most recent call
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.state.calls.lock().last().cloned()
    }

    /// Calls currently executing.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed executing at once.
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    /// Forget recorded calls and the remaining script.
    pub fn reset(&self) {
        self.state.calls.lock().clear();
        self.state.script.lock().clear();
        self.state.peak.store(self.in_flight(), Ordering::SeqCst);
    }
}

impl Default for MockRequestor {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a MockState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Requestor for MockRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let signal = options.signal.clone().unwrap_or_default();
        let call = {
            let mut calls = self.state.calls.lock();
            let call = calls.len() + 1;
            calls.push(RecordedCall {
                call,
                method: method.clone(),
                url: url.to_string(),
                data: data.clone(),
                options,
                started_at: Instant::now(),
            });
            call
        };
        let outcome = self
            .state
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.state.fallback.lock().clone());
        let latency = *self.state.latency.lock();

        let _in_flight = InFlight::enter(&self.state);
        let work = async {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match outcome {
                MockOutcome::Respond(response) => Ok(response),
                MockOutcome::Fail(error) => Err(error),
                MockOutcome::Hang => std::future::pending().await,
                MockOutcome::Echo => Ok(Response::new(json!({
                    "method": method.as_str(),
                    "url": url,
                    "data": data,
                    "call": call,
                }))),
            }
        };

        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(RequestError::aborted("Request aborted")
                .with_method(method.clone())
                .with_url(url)),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::CancellationToken;

    #[tokio::test]
    async fn test_echo_by_default() {
        let mock = MockRequestor::new();
        let response = tokio_test::assert_ok!(
            mock.post("/items", Some(json!({"a": 1})), RequestOptions::new())
                .await
        );

        assert_eq!(response.data["method"], "POST");
        assert_eq!(response.data["url"], "/items");
        assert_eq!(response.data["data"]["a"], 1);
        assert_eq!(response.data["call"], 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_script_then_fallback() {
        let mock = MockRequestor::new().with_fallback(MockOutcome::respond("fallback"));
        mock.push(MockOutcome::fail(RequestError::network("down")));

        let err = mock.get("/x", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_network_error());

        let ok = mock.get("/x", RequestOptions::new()).await.unwrap();
        assert_eq!(ok.data, json!("fallback"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_is_released_by_signal() {
        let mock = MockRequestor::new().with_fallback(MockOutcome::Hang);
        let signal = CancellationToken::new();

        let pending = tokio::spawn({
            let mock = mock.clone();
            let options = RequestOptions::new().signal(signal.clone());
            async move { mock.get("/slow", options).await }
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.in_flight(), 1);

        signal.cancel();
        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_aborted());
        assert_eq!(err.url(), Some("/slow"));
        assert_eq!(mock.in_flight(), 0);
        assert!(mock.last_call().unwrap().signal_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_peak_concurrency() {
        let mock = MockRequestor::new().with_latency(Duration::from_millis(100));
        let calls = (0..4).map(|i| {
            let mock = mock.clone();
            async move { mock.get(&format!("/{i}"), RequestOptions::new()).await }
        });

        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(mock.peak_concurrency(), 4);
        assert_eq!(mock.in_flight(), 0);
    }
}
