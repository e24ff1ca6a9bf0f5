//! # stashdb core
//!
//! Named key-value storages cached in memory and persisted to flat files or
//! SQL databases.
//!
//! This crate provides:
//! - [`Storage`]: per-name cache with lazy loads, nested paths and
//!   single-flight save sweeps
//! - [`StorageRegistry`]: the set of storages a process owns, with unique
//!   names, bulk saves and a last-chance flush before fatal errors
//! - [`AutosaveTask`]: periodic saves driven from a tokio interval
//!
//! Values are `serde_json::Value`s. On save each value is serialized,
//! passed through the storage's [`Codec`], split into chunks that fit the
//! backend, and written chunk by chunk.
//!
//! ## Example
//!
//! ```rust
//! use stashdb_core::{StorageKind, StorageOptions, StorageRegistry};
//! use stashdb_storage::SqliteExecutor;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = StorageRegistry::new();
//! let executor = Arc::new(SqliteExecutor::open_in_memory().unwrap());
//! let scores = registry
//!     .create_storage("scores", StorageKind::Sqlite, StorageOptions::new().executor(executor))
//!     .unwrap();
//!
//! scores.set("alice", json!(10));
//! registry.save_all().await;
//!
//! scores.clear_data();
//! assert_eq!(scores.get_async("alice").await.unwrap(), Some(json!(10)));
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod autosave;
mod blocking;
mod config;
mod error;
mod path;
mod registry;
mod storage;
mod types;

pub use autosave::{AutosaveHandle, AutosaveTask, StorageHost};
pub use config::{AutosaveConfig, StorageConfig, StorageOptions, MIN_AUTOSAVE_PERIOD};
pub use error::{CoreError, CoreResult};
pub use registry::StorageRegistry;
pub use storage::{Storage, Values};
pub use types::{SaveOutcome, SaveReport, StorageKind};

pub use stashdb_codec::Codec;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
