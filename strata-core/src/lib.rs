//! # Strata Core
//!
//! Composable request decorators around a pluggable transport.
//!
//! Every layer implements the [`Requestor`] contract and wraps another
//! `Requestor`, so timeouts, retries, caching, concurrency limits and
//! in-flight deduplication stack in any combination over any transport.
//!
//! ## Features
//!
//! - **Timeout**: per-attempt deadline that cancels the attempt's signal
//! - **Retry**: fixed-delay retries driven by a pluggable policy
//! - **Cache**: GET responses memoized in a [`CacheStore`] with TTL
//! - **Parallel**: FIFO-fair bound on concurrent requests
//! - **Idempotent**: identical in-flight requests share one outcome
//! - **Interceptors**: ordered request/response hooks with error hooks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//! use std::time::Duration;
//!
//! let config = RequestConfig::builder()
//!     .timeout(TimeoutConfig::new(Duration::from_secs(10)))
//!     .retry(RetryConfig::new(3, Duration::from_millis(500)))
//!     .cache(CacheConfig::default())
//!     .build();
//!
//! let client = Request::new(transport, config);
//! client.interceptors().add_request_interceptor(AuthInterceptor::bearer("token"));
//!
//! let users: Vec<User> = client.get("/users", RequestOptions::new()).await?;
//! ```
//!
//! ## Configuration Files
//!
//! Decorator settings can be loaded from JSON or TOML through
//! [`RequestSettings`]; see the [`settings`] module.

#![warn(missing_docs)]

pub mod error;
pub mod features;
pub mod interceptor;
pub mod request;
pub mod requestor;
pub mod settings;
pub mod types;

pub use error::{ErrorDetails, ErrorKind, RequestError, Result};
pub use features::*;
pub use interceptor::{
    AuthInterceptor, InterceptorHandle, InterceptorManager, LoggingInterceptor, RequestContext,
    RequestInterceptor, ResponseInterceptor, request_fn, response_fn,
};
pub use request::{Request, RequestConfig, RequestConfigBuilder, compose};
pub use requestor::{Requestor, SharedRequestor};
pub use settings::{HashAlgorithm, RequestSettings, SettingsError};
pub use types::{Method, Payload, RequestOptions, Response, ResponseType};

// Re-export collaborating crates
pub use strata_cache::{CacheStore, InMemoryCache};
pub use strata_hash::{DefaultHashService, HashService, RollingHashService};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
///
/// ```
/// use strata_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorKind, RequestError, Result};
    pub use crate::features::{
        CacheConfig, IdempotentConfig, ParallelConfig, RetryConfig, TimeoutConfig,
    };
    pub use crate::interceptor::{
        AuthInterceptor, InterceptorManager, LoggingInterceptor, RequestContext,
        RequestInterceptor, ResponseInterceptor,
    };
    pub use crate::request::{Request, RequestConfig};
    pub use crate::requestor::{Requestor, SharedRequestor};
    pub use crate::settings::RequestSettings;
    pub use crate::types::{Method, Payload, RequestOptions, Response, ResponseType};
    pub use tokio_util::sync::CancellationToken;
}
