//! # stashdb testkit
//!
//! Test utilities for stashdb.
//!
//! This crate provides:
//! - Storage fixtures over temporary files and databases
//! - A counting, gateable stub backend for concurrency tests
//! - A SQL executor that records every statement it runs
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stashdb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_storage() {
//!     let storage = TestStorage::json();
//!     storage.set("k", serde_json::json!(1));
//!     storage.save().await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backends;
pub mod executor;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backends::*;
    pub use crate::executor::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use backends::*;
pub use executor::*;
pub use fixtures::*;
pub use generators::*;
