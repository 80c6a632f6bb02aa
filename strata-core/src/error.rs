//! Request error types.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::types::Method;

/// Result type for request operations.
pub type Result<T> = std::result::Result<T, RequestError>;

/// Root-cause classification of a [`RequestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, connect, reset...).
    Network,
    /// A deadline elapsed before the response arrived.
    Timeout,
    /// The request was cancelled through its signal.
    Aborted,
    /// The server answered with a non-success status.
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// Unclassified failure.
    Unknown,
}

impl ErrorKind {
    /// Error type name used in logs and error details.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "NetworkError",
            Self::Timeout => "TimeoutError",
            Self::Aborted => "AbortError",
            Self::Http { .. } => "HttpError",
            Self::Unknown => "RequestError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error surfaced by every [`Requestor`](crate::Requestor).
///
/// Carries enough context (`url`, `method`, `status`, `retry_count`) for a
/// caller to decide programmatically how to react. The type is `Clone`
/// because the idempotent decorator hands the same settled failure to every
/// caller sharing a request identity.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    url: Option<String>,
    method: Option<Method>,
    timestamp: SystemTime,
    retry_count: Option<u32>,
    data: Option<Value>,
}

impl RequestError {
    /// Create an error of the given kind with its default code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let code = match kind {
            ErrorKind::Network => "NETWORK_ERROR".to_string(),
            ErrorKind::Timeout => "TIMEOUT".to_string(),
            ErrorKind::Aborted => "ABORT_ERR".to_string(),
            ErrorKind::Http { status } => format!("HTTP_{status}"),
            ErrorKind::Unknown => "UNKNOWN_ERROR".to_string(),
        };
        Self {
            kind,
            message: message.into(),
            code: Some(code),
            url: None,
            method: None,
            timestamp: SystemTime::now(),
            retry_count: None,
            data: None,
        }
    }

    /// Network failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Deadline exceeded.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Request cancelled.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }

    /// Non-success HTTP status.
    pub fn http(status: u16, status_text: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::Http { status },
            format!("HTTP {}: {}", status, status_text.as_ref()),
        )
    }

    /// Unclassified failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Body could not be decoded into the requested type.
    pub fn decode(err: impl fmt::Display) -> Self {
        Self::unknown(format!("Failed to decode response: {err}")).with_code("DECODE_ERROR")
    }

    /// Set the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the request method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Fill `url` and `method` only where they are not already known.
    pub fn with_context(mut self, method: &Method, url: &str) -> Self {
        if self.url.is_none() {
            self.url = Some(url.to_string());
        }
        if self.method.is_none() {
            self.method = Some(method.clone());
        }
        self
    }

    /// Override the machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a payload (typically the error response body).
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the number of retries performed so far.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub(crate) fn set_retry_count(&mut self, retry_count: u32) {
        self.retry_count = Some(retry_count);
    }

    /// Root-cause classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable code such as `TIMEOUT` or `HTTP_503`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Request URL, if known.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Request method, if known.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Wall-clock creation time.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Retries performed before this error was surfaced.
    pub fn retry_count(&self) -> Option<u32> {
        self.retry_count
    }

    /// Attached payload.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// HTTP status code if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Http { status } => Some(status),
            _ => None,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Check if this is a network error.
    pub fn is_network_error(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Check if the request was aborted.
    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }

    /// Default retry classification.
    ///
    /// 408 and 429 are the only retryable 4xx statuses; every 5xx is
    /// retryable. Network and timeout failures are retryable, aborted
    /// requests are not, and unclassified failures are.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Http { status } if (400..500).contains(&status) => {
                status == 408 || status == 429
            }
            ErrorKind::Http { .. } => true,
            ErrorKind::Network | ErrorKind::Timeout => true,
            ErrorKind::Aborted => false,
            ErrorKind::Unknown => true,
        }
    }

    /// One-line description for logs:
    /// `[Kind] message (METHOD url) Status: s Retry: n`.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("[{}]", self.kind.name()), self.message.clone()];
        if let (Some(method), Some(url)) = (&self.method, &self.url) {
            parts.push(format!("({method} {url})"));
        }
        if let Some(status) = self.status() {
            parts.push(format!("Status: {status}"));
        }
        if let Some(retry_count) = self.retry_count {
            parts.push(format!("Retry: {retry_count}"));
        }
        parts.join(" ")
    }

    /// Serializable snapshot for structured logging and debugging.
    pub fn details(&self) -> ErrorDetails {
        ErrorDetails {
            name: self.kind.name(),
            message: self.message.clone(),
            status: self.status(),
            code: self.code.clone(),
            url: self.url.clone(),
            method: self.method.as_ref().map(ToString::to_string),
            timestamp: self
                .timestamp
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            retry_count: self.retry_count,
            is_timeout: self.is_timeout(),
            is_network_error: self.is_network_error(),
            is_aborted: self.is_aborted(),
        }
    }
}

/// Flattened view of a [`RequestError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Error type name.
    pub name: &'static str,
    /// Message.
    pub message: String,
    /// HTTP status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Machine-readable code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Retries performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    /// Timeout flag.
    pub is_timeout: bool,
    /// Network flag.
    pub is_network_error: bool,
    /// Abort flag.
    pub is_aborted: bool,
}
