//! Testing utilities for strata request pipelines.
//!
//! [`MockRequestor`] is a scriptable in-memory transport: it records every
//! call, tracks how many calls are in flight, and can respond, fail, or hang
//! on demand. Combined with tokio's paused clock it makes decorator timing
//! fully deterministic.
//!
//! ```
//! use strata_core::prelude::*;
//! use strata_testing::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let mock = MockRequestor::new();
//! mock.push(MockOutcome::respond(serde_json::json!({"id": 1})));
//!
//! let response = mock.get("/users/1", RequestOptions::new()).await?;
//! assert_eq!(response.data["id"], 1);
//! assert_eq!(mock.call_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod mock;

pub use assertions::*;
pub use mock::{MockOutcome, MockRequestor, RecordedCall};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::mock::{MockOutcome, MockRequestor, RecordedCall};
}
