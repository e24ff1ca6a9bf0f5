//! Storage backend trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;
use stashdb_codec::Chunk;
use std::fmt;

/// What an [`upsert_chunk`](StorageBackend::upsert_chunk) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed for the chunk; one was inserted.
    Inserted,
    /// A row existed for the chunk and was overwritten.
    Updated,
    /// The chunk was buffered and becomes durable on the next
    /// [`flush`](StorageBackend::flush).
    Staged,
}

/// One container's key with the result of reading its chunks.
pub type ContainerChunks = (String, StorageResult<Vec<Chunk>>);

/// Durable storage of one key's encoded, chunked payload.
///
/// Each logical key owns an isolated *container* (a table, a file entry,
/// a map slot). Chunks inside a container are addressed by
/// `(fingerprint, sequence)`.
///
/// # Invariants
///
/// - `ensure_container` is idempotent; racing creations for two keys are
///   harmless
/// - `read_chunks` returns chunks ordered by sequence, or an empty vector
///   when the key has no data
/// - `upsert_chunk` never creates a duplicate row for the same
///   `(fingerprint, sequence)`
/// - Every method is a suspension point; none blocks the executor
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - Flat structured files
/// - [`super::RelationalBackend`] - SQL databases
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Largest payload a single chunk may carry, or `None` when the medium
    /// has no per-field limit and values are never split.
    fn max_chunk_len(&self) -> Option<usize>;

    /// Creates the container for `key` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreachable.
    async fn ensure_container(&self, key: &str) -> StorageResult<()>;

    /// Reads every chunk stored for `key`, ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreachable or its contents are
    /// malformed.
    async fn read_chunks(&self, key: &str) -> StorageResult<Vec<Chunk>>;

    /// Writes one chunk, overwriting an existing row for the same sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    async fn upsert_chunk(&self, key: &str, chunk: &Chunk) -> StorageResult<UpsertOutcome>;

    /// Returns true if a container for `key` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreachable.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Deletes chunks of `key` whose sequence is `keep` or greater.
    ///
    /// Called after a value has been rewritten with `keep` chunks so that a
    /// shrinking value never reassembles with a stale tail. Returns the
    /// number of chunks removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the delete.
    async fn trim_chunks(&self, key: &str, keep: u64) -> StorageResult<u64>;

    /// Removes the container for `key`. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the delete.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Lists the logical keys that currently have a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreachable.
    async fn containers(&self) -> StorageResult<Vec<String>>;

    /// Reads the chunks of every container, in container order.
    ///
    /// The outer error means the containers could not be listed; a failure
    /// reading one container is reported in its entry and does not affect
    /// the others. The default lists containers and reads each in turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unreachable or unreadable as a
    /// whole.
    async fn read_all_chunks(&self) -> StorageResult<Vec<ContainerChunks>> {
        let mut entries = Vec::new();
        for key in self.containers().await? {
            let chunks = self.read_chunks(&key).await;
            entries.push((key, chunks));
        }
        Ok(entries)
    }

    /// Makes every staged write durable.
    ///
    /// Backends that write through need not override this.
    ///
    /// # Errors
    ///
    /// Returns an error if the final write fails.
    async fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}
