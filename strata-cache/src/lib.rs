//! Cache stores for the strata request pipeline.
//!
//! The cache decorator in `strata-core` memoizes GET responses through the
//! [`CacheStore`] trait defined here, so backends can be swapped without
//! touching the decorator.
//!
//! # Examples
//!
//! ```
//! use strata_cache::*;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CacheError> {
//! let cache = InMemoryCache::new();
//! cache.set_json("key", "\"value\"".to_string(), Some(Duration::from_secs(60))).await?;
//!
//! let value: Option<String> = get(&cache, "key").await?;
//! assert_eq!(value.as_deref(), Some("value"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod helpers;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use helpers::*;
pub use memory::InMemoryCache;
pub use traits::CacheStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::CacheStore;
}
