//! Request and response types shared by every [`Requestor`](crate::Requestor).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{RequestError, Result};

pub use http::Method;

/// Opaque request/response body.
///
/// Decorators never look inside a payload except to serialize it for
/// hashing or cache-key derivation.
pub type Payload = Value;

/// Expected response body representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Raw bytes (base64 encoded into the payload).
    ArrayBuffer,
    /// JSON document.
    Json,
    /// UTF-8 text.
    Text,
    /// Opaque binary blob (base64 encoded into the payload).
    Blob,
}

/// Per-call request options.
///
/// Decorators read the fields they care about and pass everything else
/// through untouched, including the open-ended [`extra`](Self::extra) map.
///
/// Serialization is deterministic (ordered maps, empty fields skipped) and
/// never includes the cancellation signal, so two option values that differ
/// only by signal produce the same cache key and request identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Per-call deadline, overriding the timeout decorator's default.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "duration_ms_opt"
    )]
    pub timeout: Option<Duration>,
    /// Cancellation signal observed by the transport.
    #[serde(skip)]
    pub signal: Option<CancellationToken>,
    /// Expected response body representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    /// Additional fields, passed through unexamined.
    ///
    /// Keys that name a field above (`headers`, `timeout`, `signal`,
    /// `responseType`) are never serialized, so they cannot shadow it.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set an `Authorization: Bearer` header.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.as_ref()))
    }

    /// Set a per-call deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation signal.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set the expected response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set an additional pass-through field.
    ///
    /// Keys that collide with a named field are ignored.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if is_reserved(&key) {
            tracing::warn!(key = %key, "Ignoring extra option that shadows a named field");
            return self;
        }
        self.extra.insert(key, value.into());
        self
    }

    /// Whether no serializable field is set.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
            && self.timeout.is_none()
            && self.response_type.is_none()
            && self.extra.keys().all(|key| is_reserved(key))
    }

    /// Deterministic JSON form, excluding the cancellation signal.
    pub fn to_value(&self) -> Value {
        if self.extra.keys().any(|key| is_reserved(key)) {
            let mut options = self.clone();
            options.extra.retain(|key, _| !is_reserved(key));
            return options.to_value();
        }
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Deterministic JSON string, excluding the cancellation signal.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

const RESERVED_KEYS: [&str; 4] = ["headers", "timeout", "signal", "responseType"];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Response produced by a transport.
///
/// Treated as immutable once produced; interceptors that rewrite a response
/// work on their own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Decoded body.
    pub data: Payload,
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub status_text: String,
    /// Response headers (names lower-cased by transports).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Response {
    /// Create a `200 OK` response with the given body.
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            data: data.into(),
            status: 200,
            status_text: "OK".to_string(),
            headers: BTreeMap::new(),
        }
    }

    /// Set the status code and reason phrase.
    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.data).map_err(RequestError::decode)
    }

    /// Consume the response and deserialize the body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.data).map_err(RequestError::decode)
    }

    /// Replace the body, keeping status and headers.
    pub fn map_data(mut self, f: impl FnOnce(Payload) -> Payload) -> Self {
        self.data = f(self.data);
        self
    }
}

mod duration_ms_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_u64(d.as_millis() as u64),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
