//! Retry with a fixed delay between attempts.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RequestError, Result};
use crate::requestor::{Requestor, SharedRequestor};
use crate::types::{Method, Payload, RequestOptions, Response};

/// Decides whether a failed attempt should be retried.
///
/// The error passed in already carries the number of retries performed so
/// far in [`RequestError::retry_count`].
pub trait RetryPolicy: Send + Sync {
    /// Check if the request should be retried.
    fn should_retry(&self, error: &RequestError) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(&RequestError) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &RequestError) -> bool {
        self(error)
    }
}

/// Retries 5xx, 408, 429, network and timeout failures; never retries
/// other 4xx or aborted requests. See [`RequestError::is_retryable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, error: &RequestError) -> bool {
        error.is_retryable()
    }
}

/// Retry configuration.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Retryability policy.
    pub policy: Arc<dyn RetryPolicy>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            policy: Arc::new(DefaultRetryPolicy),
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl RetryConfig {
    /// Create a retry config with the default policy.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            ..Default::default()
        }
    }

    /// Create a retry config with no delay.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Replace the retryability policy.
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }
}

/// Re-issues failed calls.
///
/// Each attempt is an independent call to the inner requestor with the
/// original arguments. After `max_retries` retries, or as soon as the policy
/// declines, the last error is returned carrying the final retry count.
pub struct RetryRequestor {
    inner: SharedRequestor,
    config: RetryConfig,
}

impl RetryRequestor {
    /// Wrap `inner` with retries.
    pub fn new(inner: SharedRequestor, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl Requestor for RetryRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut retries = 0;

        loop {
            let attempt = self
                .inner
                .request(method.clone(), url, data.clone(), options.clone())
                .await;

            let mut error = match attempt {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            error.set_retry_count(retries);

            let retryable = self.config.policy.should_retry(&error);
            if !retryable || retries >= self.config.max_retries {
                if retryable {
                    warn!(
                        method = %method,
                        url = %url,
                        retries,
                        error = %error,
                        "Retries exhausted"
                    );
                }
                return Err(error);
            }

            debug!(
                method = %method,
                url = %url,
                attempt = retries + 1,
                delay = ?self.config.retry_delay,
                error = %error,
                "Retrying request"
            );
            tokio::time::sleep(self.config.retry_delay).await;
            retries += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert!(config.policy.should_retry(&RequestError::http(503, "")));
        assert!(!config.policy.should_retry(&RequestError::http(404, "")));
    }

    #[test]
    fn test_closure_policy() {
        let config = RetryConfig::immediate(5)
            .with_policy(|e: &RequestError| e.retry_count().unwrap_or(0) < 2);
        assert_eq!(config.retry_delay, Duration::ZERO);
        assert!(config.policy.should_retry(&RequestError::unknown("x").with_retry_count(1)));
        assert!(!config.policy.should_retry(&RequestError::unknown("x").with_retry_count(2)));
    }

    #[test]
    fn test_debug_omits_policy() {
        let debug = format!("{:?}", RetryConfig::default());
        assert!(debug.contains("max_retries: 3"));
    }
}
