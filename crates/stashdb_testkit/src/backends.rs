//! Instrumented backends.

use async_trait::async_trait;
use parking_lot::Mutex;
use stashdb_codec::Chunk;
use stashdb_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult, UpsertOutcome};
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;

/// An in-memory backend that counts calls, can hold callers at a gate,
/// and can be told to fail writes for chosen keys.
///
/// The gate guards `ensure_container` and `read_chunks`, so a closed gate
/// parks save sweeps and loads at their first backend call.
///
/// # Example
///
/// ```rust,ignore
/// let backend = Arc::new(CountingBackend::gated());
/// let handle = storage.save_async().unwrap();
/// assert!(storage.save().await.is_skipped());
/// backend.open_gate();
/// handle.await.unwrap();
/// assert_eq!(backend.sweeps(), 1);
/// ```
#[derive(Debug)]
pub struct CountingBackend {
    inner: InMemoryBackend,
    calls: Mutex<HashMap<&'static str, u64>>,
    gate: watch::Sender<bool>,
    failing: Mutex<HashSet<String>>,
}

impl Default for CountingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingBackend {
    /// Creates a backend with an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inner(InMemoryBackend::new(), true)
    }

    /// Creates a backend whose gate starts closed.
    #[must_use]
    pub fn gated() -> Self {
        Self::with_inner(InMemoryBackend::new(), false)
    }

    /// Creates a backend that splits values into chunks of at most
    /// `max_chunk_len` bytes.
    #[must_use]
    pub fn with_max_chunk_len(max_chunk_len: usize) -> Self {
        Self::with_inner(InMemoryBackend::with_max_chunk_len(max_chunk_len), true)
    }

    fn with_inner(inner: InMemoryBackend, open: bool) -> Self {
        let (gate, _) = watch::channel(open);
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            gate,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped in-memory backend.
    #[must_use]
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Lets parked and future callers through.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Parks future callers until [`open_gate`](Self::open_gate).
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    /// Makes every `upsert_chunk` for `key` fail.
    pub fn fail_writes_for(&self, key: &str) {
        self.failing.lock().insert(key.to_string());
    }

    /// Number of calls to the named backend method.
    #[must_use]
    pub fn calls(&self, method: &str) -> u64 {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    /// Number of completed save sweeps (each sweep ends with one flush).
    #[must_use]
    pub fn sweeps(&self) -> u64 {
        self.calls("flush")
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().entry(method).or_default() += 1;
    }

    async fn pass_gate(&self) {
        let mut rx = self.gate.subscribe();
        // the sender lives in self, so this cannot fail
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    fn max_chunk_len(&self) -> Option<usize> {
        self.inner.max_chunk_len()
    }

    async fn ensure_container(&self, key: &str) -> StorageResult<()> {
        self.pass_gate().await;
        self.record("ensure_container");
        self.inner.ensure_container(key).await
    }

    async fn read_chunks(&self, key: &str) -> StorageResult<Vec<Chunk>> {
        self.pass_gate().await;
        self.record("read_chunks");
        self.inner.read_chunks(key).await
    }

    async fn upsert_chunk(&self, key: &str, chunk: &Chunk) -> StorageResult<UpsertOutcome> {
        self.record("upsert_chunk");
        if self.failing.lock().contains(key) {
            return Err(StorageError::query(format!("injected failure for {key:?}")));
        }
        self.inner.upsert_chunk(key, chunk).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.record("exists");
        self.inner.exists(key).await
    }

    async fn trim_chunks(&self, key: &str, keep: u64) -> StorageResult<u64> {
        self.record("trim_chunks");
        self.inner.trim_chunks(key, keep).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.record("delete");
        self.inner.delete(key).await
    }

    async fn containers(&self) -> StorageResult<Vec<String>> {
        self.record("containers");
        self.inner.containers().await
    }

    async fn flush(&self) -> StorageResult<()> {
        self.record("flush");
        Ok(())
    }
}
