//! File-based configuration.
//!
//! [`RequestSettings`] is the serde form of [`RequestConfig`]: durations are
//! integer milliseconds and every field is optional. A present section
//! (even an empty one) installs that decorator; missing fields take the
//! decorator's defaults.
//!
//! ```toml
//! [timeout]
//! timeout_ms = 5000
//!
//! [retry]
//! max_retries = 2
//! retry_delay_ms = 250
//!
//! [idempotent]
//! hash = "sha256"
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strata_hash::{DefaultHashService, HashService, RollingHashService};
use thiserror::Error;

use crate::features::{CacheConfig, IdempotentConfig, ParallelConfig, RetryConfig, TimeoutConfig};
use crate::request::RequestConfig;

/// Settings loading errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Invalid JSON document.
    #[error("Invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid TOML document.
    #[error("Invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Serializable decorator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestSettings {
    /// Timeout section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutSettings>,
    /// Retry section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,
    /// Cache section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSettings>,
    /// Parallel section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<ParallelSettings>,
    /// Idempotent section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<IdempotentSettings>,
}

/// Timeout section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Per-attempt deadline in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Message carried by timeout errors.
    pub timeout_error_message: Option<String>,
}

/// Retry section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_retries: Option<u32>,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: Option<u64>,
}

/// Cache section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Lifetime of a cached response in milliseconds.
    pub ttl_ms: Option<u64>,
}

/// Parallel section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelSettings {
    /// Maximum number of simultaneous calls.
    pub max_concurrent: Option<usize>,
    /// Advisory slot wait in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Idempotent section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdempotentSettings {
    /// Dedup window in milliseconds.
    pub dedupe_time_ms: Option<u64>,
    /// Identity hash algorithm.
    pub hash: Option<HashAlgorithm>,
}

/// Request identity hash selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 ([`DefaultHashService`]).
    #[default]
    Sha256,
    /// Legacy 32-bit rolling hash ([`RollingHashService`]).
    Rolling,
}

impl HashAlgorithm {
    fn service(self) -> Arc<dyn HashService> {
        match self {
            Self::Sha256 => Arc::new(DefaultHashService::new()),
            Self::Rolling => Arc::new(RollingHashService::new()),
        }
    }
}

impl RequestSettings {
    /// Parse settings from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parse settings from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(s)?)
    }

    /// Build a [`RequestConfig`], applying defaults field by field.
    pub fn into_config(self) -> RequestConfig {
        RequestConfig {
            timeout: self.timeout.map(|s| {
                let defaults = TimeoutConfig::default();
                TimeoutConfig {
                    timeout: s.timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
                    timeout_error_message: s
                        .timeout_error_message
                        .unwrap_or(defaults.timeout_error_message),
                }
            }),
            retry: self.retry.map(|s| {
                let defaults = RetryConfig::default();
                RetryConfig {
                    max_retries: s.max_retries.unwrap_or(defaults.max_retries),
                    retry_delay: s
                        .retry_delay_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.retry_delay),
                    policy: defaults.policy,
                }
            }),
            cache: self.cache.map(|s| {
                let defaults = CacheConfig::default();
                CacheConfig {
                    ttl: s.ttl_ms.map(Duration::from_millis).unwrap_or(defaults.ttl),
                    ..defaults
                }
            }),
            parallel: self.parallel.map(|s| {
                let defaults = ParallelConfig::default();
                ParallelConfig {
                    max_concurrent: s.max_concurrent.unwrap_or(defaults.max_concurrent),
                    timeout: s.timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
                }
            }),
            idempotent: self.idempotent.map(|s| {
                let defaults = IdempotentConfig::default();
                IdempotentConfig {
                    dedupe_time: s
                        .dedupe_time_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.dedupe_time),
                    hash_service: s.hash.unwrap_or_default().service(),
                    request_id: None,
                }
            }),
        }
    }
}
