//! Per-call deadline.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{RequestError, Result};
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Timeout configuration.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Deadline applied to each call unless the call's options carry one.
    pub timeout: Duration,
    /// Message of the error raised when the deadline fires.
    pub timeout_error_message: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            timeout_error_message: "Request timeout".to_string(),
        }
    }
}

impl TimeoutConfig {
    /// Create a configuration with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Set the timeout error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.timeout_error_message = message.into();
        self
    }
}

/// Bounds the latency of every call.
///
/// The clock starts when the decorator is entered, not when the transport
/// begins I/O. A cancellation token is always handed to the inner requestor:
/// a child of the caller's token when one was supplied, a fresh one
/// otherwise. When the deadline fires the token is cancelled and a
/// timeout-classified error is returned. The deadline timer is dropped with
/// the call on every exit path.
pub struct TimeoutRequestor {
    inner: SharedRequestor,
    config: TimeoutConfig,
}

impl TimeoutRequestor {
    /// Wrap `inner` with a deadline.
    pub fn new(inner: SharedRequestor, config: TimeoutConfig) -> Self {
        Self { inner, config }
    }

    /// Get the timeout configuration.
    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }
}

#[async_trait]
impl Requestor for TimeoutRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        mut options: RequestOptions,
    ) -> Result<Response> {
        let deadline = options.timeout.unwrap_or(self.config.timeout);
        let signal = match &options.signal {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        options.signal = Some(signal.clone());

        let call = self.inner.request(method.clone(), url, data, options);
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                signal.cancel();
                warn!(
                    method = %method,
                    url = %url,
                    timeout = ?deadline,
                    "Request timed out"
                );
                Err(RequestError::timeout(&self.config.timeout_error_message)
                    .with_method(method)
                    .with_url(url))
            }
        }
    }
}
