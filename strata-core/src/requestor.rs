//! The `Requestor` contract.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Method, Payload, RequestOptions, Response};

/// Asynchronous HTTP call capability.
///
/// Transports implement it, and so does every decorator: each decorator
/// wraps an `Arc<dyn Requestor>` and is itself a `Requestor`, so layers
/// nest freely. Only [`request`](Self::request) is required; the per-method
/// helpers route through it.
#[async_trait]
pub trait Requestor: Send + Sync {
    /// Perform a request.
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response>;

    /// Perform a GET request.
    async fn get(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, url, None, options).await
    }

    /// Perform a POST request.
    async fn post(
        &self,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::POST, url, data, options).await
    }

    /// Perform a PUT request.
    async fn put(
        &self,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::PUT, url, data, options).await
    }

    /// Perform a DELETE request.
    async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, url, None, options).await
    }

    /// Perform a PATCH request.
    async fn patch(
        &self,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.request(Method::PATCH, url, data, options).await
    }
}

/// Shared handle to a type-erased requestor.
pub type SharedRequestor = Arc<dyn Requestor>;

#[async_trait]
impl<R: Requestor + ?Sized> Requestor for Arc<R> {
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Response> {
        (**self).request(method, url, data, options).await
    }
}
