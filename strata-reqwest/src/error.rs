//! Transport errors.

use strata_core::RequestError;
use thiserror::Error;

/// Errors raised while building a [`ReqwestRequestor`](crate::ReqwestRequestor).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// A default header name or value is invalid.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// The underlying client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Classify a reqwest failure.
pub(crate) fn transport_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::timeout(err.to_string())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        RequestError::network(err.to_string())
    } else if err.is_decode() {
        RequestError::decode(err)
    } else {
        RequestError::unknown(err.to_string())
    }
}
