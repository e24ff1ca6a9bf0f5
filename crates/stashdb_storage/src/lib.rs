//! # stashdb storage
//!
//! Durable storage of one key's encoded, chunked payload.
//!
//! Every backend implements the same capability set
//! ([`StorageBackend`]): ensure a container exists, read all chunks of a
//! key, upsert one chunk, and check existence. Backends never interpret
//! payloads beyond what their medium requires.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - One structured file (JSON, YAML, properties, CBOR or
//!   enum list) holding every key; chunking is a no-op
//! - [`RelationalBackend`] - One table per key with chunked rows, driven
//!   through any [`SqlExecutor`]
//!
//! ## Example
//!
//! ```rust
//! use stashdb_codec::{Chunk, KeyCodec};
//! use stashdb_storage::{InMemoryBackend, StorageBackend};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backend = InMemoryBackend::new();
//! let chunk = Chunk::new(KeyCodec::fingerprint("scores"), 0, r#"{"alice":10}"#);
//!
//! backend.ensure_container("scores").await.unwrap();
//! backend.upsert_chunk("scores", &chunk).await.unwrap();
//! assert_eq!(backend.read_chunks("scores").await.unwrap(), vec![chunk]);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod sql;

pub use backend::{ContainerChunks, StorageBackend, UpsertOutcome};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileFormat, StructuredFile};
pub use memory::InMemoryBackend;
pub use sql::{
    QueryResult, QueryStatus, RelationalBackend, RelationalOptions, Row, SqlDialect, SqlExecutor,
    SqliteExecutor, Statement,
};
