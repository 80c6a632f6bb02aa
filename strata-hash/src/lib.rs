//! # Strata Hash
//!
//! Deterministic request fingerprints for the strata request pipeline.
//!
//! The idempotent decorator collapses concurrent requests that share an
//! identity. That identity is derived by a [`HashService`] from the request's
//! method, URL, body and options.
//!
//! Two services are provided:
//!
//! - [`DefaultHashService`]: SHA-256 over the canonical request form, hex
//!   encoded. Collisions between distinct requests are not a practical concern.
//! - [`RollingHashService`]: the legacy 32-bit rolling hash rendered in base 36.
//!   Kept for interop with identities produced by older clients; it collides
//!   easily and should not be used for deduplication of untrusted traffic.
//!
//! ## Example
//!
//! ```
//! use strata_hash::{DefaultHashService, HashService};
//! use serde_json::json;
//!
//! let hasher = DefaultHashService::new();
//! let a = hasher.generate_request_hash("GET", "/users", None, None);
//! let b = hasher.generate_request_hash("get", "/users", None, None);
//! assert_eq!(a, b);
//!
//! let c = hasher.generate_request_hash("POST", "/users", Some(&json!({"id": 1})), None);
//! assert_ne!(a, c);
//! ```

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hash service used to derive stable request identifiers.
pub trait HashService: Send + Sync {
    /// Hash an arbitrary string.
    fn generate_hash(&self, input: &str) -> String;

    /// Hash a request from its method, URL, body and serialized options.
    ///
    /// The default implementation hashes
    /// `METHOD|URL|JSON(data)|JSON(options)` with an empty segment for
    /// absent (or `null`) parts.
    fn generate_request_hash(
        &self,
        method: &str,
        url: &str,
        data: Option<&Value>,
        options: Option<&Value>,
    ) -> String {
        self.generate_hash(&canonical_request(method, url, data, options))
    }
}

/// Build the canonical `METHOD|URL|BODY|OPTIONS` string that request hashes
/// are computed over.
pub fn canonical_request(
    method: &str,
    url: &str,
    data: Option<&Value>,
    options: Option<&Value>,
) -> String {
    let parts = [
        method.to_uppercase(),
        url.to_string(),
        json_segment(data),
        json_segment(options),
    ];
    parts.join("|")
}

fn json_segment(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => v.to_string(),
    }
}

/// SHA-256 based hash service.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHashService;

impl DefaultHashService {
    /// Create a new SHA-256 hash service.
    pub fn new() -> Self {
        Self
    }
}

impl HashService for DefaultHashService {
    fn generate_hash(&self, input: &str) -> String {
        format!("{:x}", Sha256::digest(input.as_bytes()))
    }
}

/// Legacy 32-bit rolling hash (`h = h * 31 + c` over UTF-16 code units),
/// rendered as a signed base-36 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingHashService;

impl RollingHashService {
    /// Create a new rolling hash service.
    pub fn new() -> Self {
        Self
    }
}

impl HashService for RollingHashService {
    fn generate_hash(&self, input: &str) -> String {
        let hash = input.encode_utf16().fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });
        to_base36(i64::from(hash))
    }
}

fn to_base36(value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if value < 0 {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
