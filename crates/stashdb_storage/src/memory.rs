//! In-memory storage backend for testing.

use crate::backend::{StorageBackend, UpsertOutcome};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use stashdb_codec::{Chunk, KeyCodec};
use std::collections::BTreeMap;

/// An in-memory storage backend.
///
/// Each key's container is an ordered map from sequence number to chunk.
/// This backend is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral storages that don't need persistence
///
/// # Example
///
/// ```rust
/// use stashdb_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::with_max_chunk_len(16);
/// assert_eq!(backend.max_chunk_len(), Some(16));
/// assert_eq!(backend.container_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    containers: RwLock<IndexMap<String, BTreeMap<u64, Chunk>>>,
    max_chunk_len: Option<usize>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend with no chunk limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend that splits values into chunks of at most
    /// `max_chunk_len` bytes.
    #[must_use]
    pub fn with_max_chunk_len(max_chunk_len: usize) -> Self {
        Self {
            containers: RwLock::default(),
            max_chunk_len: Some(max_chunk_len),
        }
    }

    /// Stores `payload` for `key` as a single chunk, replacing whatever was
    /// there.
    ///
    /// Useful for seeding recovery scenarios in tests.
    pub fn insert_payload(&self, key: &str, payload: impl Into<String>) {
        let chunk = Chunk::new(KeyCodec::fingerprint(key), 0, payload);
        let mut container = BTreeMap::new();
        container.insert(0, chunk);
        self.containers.write().insert(key.to_string(), container);
    }

    /// Returns the number of chunks stored for `key`.
    #[must_use]
    pub fn chunk_count(&self, key: &str) -> usize {
        self.containers.read().get(key).map_or(0, BTreeMap::len)
    }

    /// Returns the number of containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.read().len()
    }

    /// Clears all data from the backend.
    pub fn clear(&self) {
        self.containers.write().clear();
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn max_chunk_len(&self) -> Option<usize> {
        self.max_chunk_len
    }

    async fn ensure_container(&self, key: &str) -> StorageResult<()> {
        self.containers
            .write()
            .entry(key.to_string())
            .or_default();
        Ok(())
    }

    async fn read_chunks(&self, key: &str) -> StorageResult<Vec<Chunk>> {
        Ok(self
            .containers
            .read()
            .get(key)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_chunk(&self, key: &str, chunk: &Chunk) -> StorageResult<UpsertOutcome> {
        let mut containers = self.containers.write();
        let container = containers.get_mut(key).ok_or_else(|| {
            StorageError::InvalidOperation(format!("no container for key {key:?}"))
        })?;
        match container.insert(chunk.sequence, chunk.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.containers.read().contains_key(key))
    }

    async fn trim_chunks(&self, key: &str, keep: u64) -> StorageResult<u64> {
        let mut containers = self.containers.write();
        let Some(container) = containers.get_mut(key) else {
            return Ok(0);
        };
        let stale = container.split_off(&keep);
        Ok(stale.len() as u64)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.containers.write().shift_remove(key).is_some())
    }

    async fn containers(&self) -> StorageResult<Vec<String>> {
        Ok(self.containers.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(key: &str, sequence: u64, payload: &str) -> Chunk {
        Chunk::new(KeyCodec::fingerprint(key), sequence, payload)
    }

    #[tokio::test]
    async fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.container_count(), 0);
        assert!(backend.read_chunks("missing").await.unwrap().is_empty());
        assert!(!backend.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn memory_upsert_inserts_then_updates() {
        let backend = InMemoryBackend::new();
        backend.ensure_container("k").await.unwrap();

        let outcome = backend.upsert_chunk("k", &chunk("k", 0, "a")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let outcome = backend.upsert_chunk("k", &chunk("k", 0, "b")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        assert_eq!(backend.read_chunks("k").await.unwrap(), vec![chunk("k", 0, "b")]);
    }

    #[tokio::test]
    async fn memory_upsert_without_container_fails() {
        let backend = InMemoryBackend::new();
        let result = backend.upsert_chunk("k", &chunk("k", 0, "a")).await;
        assert!(matches!(result, Err(StorageError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn memory_chunks_are_ordered() {
        let backend = InMemoryBackend::new();
        backend.ensure_container("k").await.unwrap();
        for seq in [2, 0, 1] {
            backend
                .upsert_chunk("k", &chunk("k", seq, &seq.to_string()))
                .await
                .unwrap();
        }
        let sequences: Vec<_> = backend
            .read_chunks("k")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.sequence)
            .collect();
        assert_eq!(sequences, [0, 1, 2]);
    }

    #[tokio::test]
    async fn memory_trim_drops_tail() {
        let backend = InMemoryBackend::new();
        backend.ensure_container("k").await.unwrap();
        for seq in 0..4 {
            backend.upsert_chunk("k", &chunk("k", seq, "x")).await.unwrap();
        }
        assert_eq!(backend.trim_chunks("k", 1).await.unwrap(), 3);
        assert_eq!(backend.chunk_count("k"), 1);
        assert_eq!(backend.trim_chunks("missing", 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn memory_delete_and_containers() {
        let backend = InMemoryBackend::new();
        backend.insert_payload("a", "1");
        backend.insert_payload("b", "2");
        assert_eq!(backend.containers().await.unwrap(), ["a", "b"]);

        assert!(backend.delete("a").await.unwrap());
        assert!(!backend.delete("a").await.unwrap());
        assert_eq!(backend.containers().await.unwrap(), ["b"]);
    }

    #[test]
    fn memory_clear() {
        let backend = InMemoryBackend::new();
        backend.insert_payload("a", "1");
        backend.clear();
        assert_eq!(backend.container_count(), 0);
    }
}
