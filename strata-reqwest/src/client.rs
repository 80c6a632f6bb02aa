//! reqwest-backed `Requestor`.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use strata_core::{
    Method, Payload, RequestError, RequestOptions, Requestor, Response, ResponseType, Result,
};
use tracing::debug;
use url::Url;

use crate::config::ReqwestConfig;
use crate::error::{ClientError, transport_error};

/// Transport that performs requests with a pooled [`reqwest::Client`].
///
/// Bodies are sent as JSON. Non-2xx responses become `Http` errors carrying
/// the decoded error body as their data. Cancelling the options' signal
/// aborts the exchange with an `Aborted` error.
#[derive(Clone)]
pub struct ReqwestRequestor {
    inner: reqwest::Client,
    base_url: Option<Url>,
    config: ReqwestConfig,
}

impl ReqwestRequestor {
    /// Build a transport from `config`.
    pub fn new(config: ReqwestConfig) -> std::result::Result<Self, ClientError> {
        let base_url = config.base_url.as_deref().map(Url::parse).transpose()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(config.gzip)
            .brotli(config.brotli)
            .redirect(redirect)
            .build()?;

        Ok(Self {
            inner,
            base_url,
            config,
        })
    }

    /// Build a transport with default configuration.
    pub fn default_client() -> std::result::Result<Self, ClientError> {
        Self::new(ReqwestConfig::default())
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.config
    }

    /// Resolve `url` against the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|e| {
            RequestError::unknown(format!("Invalid URL '{url}': {e}")).with_code("INVALID_URL")
        })
    }

    async fn exchange(
        &self,
        method: Method,
        url: Url,
        data: Option<Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let mut builder = self.inner.request(method, url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(data) = &data {
            builder = builder.json(data);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if !status.is_success() {
            return Err(RequestError::http(status.as_u16(), &status_text)
                .with_data(decode_lenient(&body)));
        }

        let data = decode_body(&body, options.response_type)?;
        Ok(Response {
            data,
            status: status.as_u16(),
            status_text,
            headers,
        })
    }
}

/// Decode a success body according to the requested response type.
fn decode_body(body: &Bytes, response_type: Option<ResponseType>) -> Result<Value> {
    match response_type {
        None => Ok(decode_lenient(body)),
        Some(ResponseType::Json) if body.is_empty() => Ok(Value::Null),
        Some(ResponseType::Json) => serde_json::from_slice(body).map_err(RequestError::decode),
        Some(ResponseType::Text) => Ok(Value::String(String::from_utf8_lossy(body).into_owned())),
        Some(ResponseType::ArrayBuffer | ResponseType::Blob) => Ok(Value::String(
            base64::engine::general_purpose::STANDARD.encode(body),
        )),
    }
}

/// JSON when it parses, text otherwise; an empty body is `null`.
fn decode_lenient(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[async_trait]
impl Requestor for ReqwestRequestor {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        let target = self.resolve(url).map_err(|e| e.with_context(&method, url))?;
        debug!(method = %method, url = %target, "Sending request");

        let signal = options.signal.clone().unwrap_or_default();
        let exchange = self.exchange(method.clone(), target, data, &options);

        let result = tokio::select! {
            biased;
            _ = signal.cancelled() => Err(RequestError::aborted("Request aborted")),
            result = exchange => result,
        };
        result.map_err(|e| e.with_context(&method, url))
    }
}
