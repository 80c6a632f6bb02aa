//! # Strata reqwest transport
//!
//! A [`Requestor`](strata_core::Requestor) backed by a pooled
//! [`reqwest::Client`], ready to be wrapped by the strata decorators.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata_core::prelude::*;
//! use strata_reqwest::{ReqwestConfig, ReqwestRequestor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let transport = ReqwestRequestor::new(
//!         ReqwestConfig::builder()
//!             .base_url("https://api.example.com/")
//!             .build(),
//!     )?;
//!
//!     let client = Request::new(
//!         transport,
//!         RequestConfig::builder()
//!             .timeout(TimeoutConfig::new(Duration::from_secs(5)))
//!             .retry(RetryConfig::default())
//!             .build(),
//!     );
//!
//!     let user: serde_json::Value = client.get("users/1", RequestOptions::new()).await?;
//!     println!("{user}");
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::ReqwestRequestor;
pub use config::{ReqwestConfig, ReqwestConfigBuilder};
pub use error::ClientError;
