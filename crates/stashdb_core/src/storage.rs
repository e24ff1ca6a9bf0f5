//! Named, lazily-loaded key-value storage over one backend.

use crate::config::StorageConfig;
use crate::blocking;
use crate::error::CoreResult;
use crate::path;
use crate::types::{SaveOutcome, SaveReport, StorageKind};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use stashdb_codec::{chunk, decode_value, encode_value, Chunk, Codec, KeyCodec};
use stashdb_storage::{StorageBackend, StorageError, StorageResult, UpsertOutcome};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Cached key/value map of a storage.
pub type Values = IndexMap<String, Value>;

/// A named key-value store cached in memory and persisted through a
/// [`StorageBackend`].
///
/// Reads through [`get`](Self::get) only consult the cache. Misses are
/// resolved by [`get_async`](Self::get_async), which loads the key from the
/// backend. Writes only touch the cache until [`save`](Self::save) sweeps
/// every cached key to the backend.
///
/// # Invariants
///
/// - At most one save sweep per storage is in flight; further requests are
///   no-ops until it finishes
/// - Concurrent loads of the same missing key issue one backend read
/// - A key removed while a sweep is in flight stays removed; the sweep
///   never writes it back
/// - Backend failures during loads and sweeps are logged, never raised;
///   malformed stored data is raised as a decode error
///
/// # Example
///
/// ```rust
/// use stashdb_core::{Storage, StorageConfig, StorageKind};
/// use stashdb_storage::InMemoryBackend;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let storage = Storage::new(
///     "players",
///     StorageKind::Sqlite,
///     Arc::new(InMemoryBackend::new()),
///     StorageConfig::default(),
/// );
///
/// storage.set_nested("steve.coins", json!(10));
/// assert_eq!(storage.get("steve"), Some(json!({"coins": 10})));
///
/// let outcome = storage.save().await;
/// assert_eq!(outcome.report().unwrap().keys_saved, 1);
/// # });
/// ```
pub struct Storage {
    name: String,
    kind: StorageKind,
    backend: Arc<dyn StorageBackend>,
    config: StorageConfig,
    values: RwLock<Values>,
    saving: Arc<AtomicBool>,
    loads: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    removed: Mutex<HashSet<String>>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("backend", &self.backend)
            .field("keys", &self.values.read().len())
            .field("saving", &self.is_saving())
            .finish_non_exhaustive()
    }
}

/// Clears an in-flight marker when the work it guards ends, however it ends.
pub(crate) struct SaveGuard {
    flag: Arc<AtomicBool>,
}

impl SaveGuard {
    pub(crate) fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Per-key outcome of one sweep step.
#[derive(Default)]
struct KeyStats {
    inserted: u64,
    updated: u64,
    staged: u64,
    trimmed: u64,
}

impl Storage {
    /// Creates a storage over `backend`.
    ///
    /// Most callers go through
    /// [`StorageRegistry::create_storage`](crate::StorageRegistry::create_storage),
    /// which also enforces name uniqueness.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: StorageKind,
        backend: Arc<dyn StorageBackend>,
        config: StorageConfig,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            backend,
            config,
            values: RwLock::new(Values::new()),
            saving: Arc::new(AtomicBool::new(false)),
            loads: Mutex::new(HashMap::new()),
            removed: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the storage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage kind.
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the value codec.
    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.config.codec
    }

    /// Returns true while a save sweep is in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    // =========================================================================
    // Cache access
    // =========================================================================

    /// Returns the cached value for `key`. Never touches the backend.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Returns the cached value for `key`, or `default`.
    #[must_use]
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Caches `value` under `key`.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    /// Returns true if `key` is cached.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Cached keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// A copy of the whole cache.
    #[must_use]
    pub fn snapshot(&self) -> Values {
        self.values.read().clone()
    }

    /// Iterates over a copy of the cache.
    pub fn iter(&self) -> impl Iterator<Item = (String, Value)> {
        self.snapshot().into_iter()
    }

    /// Replaces the whole cache.
    pub fn set_data(&self, values: Values) {
        *self.values.write() = values;
    }

    /// Merges `values` into the cache. Later entries win.
    pub fn add_data(&self, values: impl IntoIterator<Item = (String, Value)>) {
        let mut cache = self.values.write();
        for (key, value) in values {
            cache.insert(key, value);
        }
    }

    /// Drops every cache entry whose value equals one of `values`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_data(&self, values: &[Value]) -> usize {
        let mut cache = self.values.write();
        let before = cache.len();
        cache.retain(|_, value| !values.contains(value));
        before - cache.len()
    }

    /// Empties the cache. The backend is untouched.
    pub fn clear_data(&self) {
        self.values.write().clear();
    }

    /// Empties the cache so later reads load fresh data from the backend.
    pub fn reload(&self) {
        self.clear_data();
        debug!(storage = %self.name, "cache dropped for reload");
    }

    // =========================================================================
    // Nested paths
    // =========================================================================

    /// Reads a dotted path from the cache.
    ///
    /// Returns `None` as soon as a segment is missing.
    #[must_use]
    pub fn get_nested(&self, dotted: &str) -> Option<Value> {
        let (head, rest) = path::split(dotted);
        let values = self.values.read();
        path::lookup(values.get(head)?, &rest).cloned()
    }

    /// Reads a dotted path from the cache, or returns `default`.
    #[must_use]
    pub fn get_nested_or(&self, dotted: &str, default: Value) -> Value {
        self.get_nested(dotted).unwrap_or(default)
    }

    /// Writes `value` at a dotted path, creating intermediate objects.
    pub fn set_nested(&self, dotted: &str, value: Value) {
        let (head, rest) = path::split(dotted);
        let mut values = self.values.write();
        let root = values.entry(head.to_string()).or_insert(Value::Null);
        path::assign(root, &rest, value);
    }

    /// Reads a dotted path, loading the top-level key on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the stored value is malformed.
    pub async fn get_nested_async(&self, dotted: &str) -> CoreResult<Option<Value>> {
        let (head, rest) = path::split(dotted);
        let Some(mut current) = self.get_async(head).await? else {
            return Ok(None);
        };
        for segment in rest {
            let Some(next) = path::lookup(&current, &[segment]).cloned() else {
                return Ok(None);
            };
            current = next;
            tokio::task::yield_now().await;
        }
        Ok(Some(current))
    }

    /// Writes `value` at a dotted path.
    ///
    /// Unlike [`set_nested`](Self::set_nested), a top-level key missing
    /// from the cache is loaded first so its stored fields are kept.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the stored value is malformed.
    pub async fn set_nested_async(&self, dotted: &str, value: Value) -> CoreResult<()> {
        let (head, _) = path::split(dotted);
        if !self.contains_key(head) {
            self.get_async(head).await?;
        }
        tokio::task::yield_now().await;
        self.set_nested(dotted, value);
        Ok(())
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Returns the value for `key`, loading it from the backend on a miss.
    ///
    /// Returns `None` if the backend has no data for `key` or could not be
    /// reached (the failure is logged).
    ///
    /// # Errors
    ///
    /// Returns a decode error if the stored value is malformed.
    pub async fn get_async(&self, key: &str) -> CoreResult<Option<Value>> {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }

        let lock = self.load_lock(key);
        let held = lock.lock().await;
        // another caller may have finished the load while we waited
        let result = match self.get(key) {
            Some(value) => Ok(Some(value)),
            None => self.load_key(key).await,
        };
        drop(held);
        self.release_load_lock(key, &lock);
        result
    }

    /// Like [`get_async`](Self::get_async) with a fallback value.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the stored value is malformed.
    pub async fn get_async_or(&self, key: &str, default: Value) -> CoreResult<Value> {
        Ok(self.get_async(key).await?.unwrap_or(default))
    }

    fn load_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.loads.lock().entry(key.to_string()).or_default())
    }

    fn release_load_lock(&self, key: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut loads = self.loads.lock();
        // the map and `lock` are the only holders: nobody is waiting
        if Arc::strong_count(lock) <= 2 {
            loads.remove(key);
        }
    }

    async fn load_key(&self, key: &str) -> CoreResult<Option<Value>> {
        let Some(value) = self.read_backend(key, false).await? else {
            return Ok(None);
        };
        let cached = self
            .values
            .write()
            .entry(key.to_string())
            .or_insert(value)
            .clone();
        debug!(storage = %self.name, key, "loaded from backend");
        Ok(Some(cached))
    }

    /// Reads and decodes one key without touching the cache.
    ///
    /// In lenient mode backend failures are logged and read as "no data";
    /// malformed data is always an error.
    async fn read_backend(&self, key: &str, strict: bool) -> CoreResult<Option<Value>> {
        let chunks = self.backend.read_chunks(key).await;
        self.decode_chunks(key, chunks, strict)
    }

    fn decode_chunks(
        &self,
        key: &str,
        chunks: StorageResult<Vec<Chunk>>,
        strict: bool,
    ) -> CoreResult<Option<Value>> {
        let chunks = match chunks {
            Ok(chunks) => chunks,
            Err(e) if strict || e.is_data_error() => return Err(e.into()),
            Err(e) => {
                warn!(storage = %self.name, key, error = %e, "backend read failed");
                return Ok(None);
            }
        };
        if chunks.is_empty() {
            return Ok(None);
        }
        let payload = chunk::reassemble(chunks)?;
        Ok(Some(decode_value(&payload, &self.config.codec)?))
    }

    /// Reads every key the backend holds without touching the cache.
    ///
    /// Keys that fail to read are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns a decode error if any stored value is malformed.
    pub async fn get_all_async(&self) -> CoreResult<Values> {
        self.read_all(false).await
    }

    /// Replaces the cache with everything the backend holds.
    ///
    /// # Errors
    ///
    /// Returns a decode error if any stored value is malformed; the cache
    /// is left unchanged in that case.
    pub async fn load_all_data(&self) -> CoreResult<Values> {
        let values = self.read_all(false).await?;
        self.set_data(values.clone());
        debug!(storage = %self.name, keys = values.len(), "loaded all data");
        Ok(values)
    }

    /// Like [`load_all_data`](Self::load_all_data) but any backend failure
    /// is returned instead of logged.
    ///
    /// # Errors
    ///
    /// Returns the first backend or decode error.
    pub async fn load_all_data_strict(&self) -> CoreResult<Values> {
        let values = self.read_all(true).await?;
        self.set_data(values.clone());
        Ok(values)
    }

    async fn read_all(&self, strict: bool) -> CoreResult<Values> {
        let entries = match self.backend.read_all_chunks().await {
            Ok(entries) => entries,
            Err(e) if strict || e.is_data_error() => return Err(e.into()),
            Err(e) => {
                warn!(storage = %self.name, error = %e, "bulk read failed");
                return Ok(Values::new());
            }
        };

        let mut values = Values::with_capacity(entries.len());
        for (key, chunks) in entries {
            if let Some(value) = self.decode_chunks(&key, chunks, strict)? {
                values.insert(key, value);
            }
        }
        Ok(values)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes `key` from the cache and the backend.
    ///
    /// Returns true if the key is now gone everywhere (including when it
    /// never existed) and false if the backend refused the delete.
    ///
    /// During an in-flight sweep the key is also marked removed, so the
    /// sweep skips it or deletes it again after writing it.
    pub async fn remove(&self, key: &str) -> bool {
        let cached = self.values.write().shift_remove(key).is_some();
        if self.is_saving() {
            self.removed.lock().insert(key.to_string());
        }
        match self.backend.delete(key).await {
            Ok(stored) => {
                debug!(storage = %self.name, key, cached, stored, "removed");
                true
            }
            Err(e) => {
                error!(storage = %self.name, key, error = %e, "backend delete failed");
                false
            }
        }
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Writes every cached key to the backend.
    ///
    /// Returns [`SaveOutcome::Skipped`] without doing anything if a sweep
    /// for this storage is already in flight.
    pub async fn save(&self) -> SaveOutcome {
        let Some(_guard) = SaveGuard::try_acquire(&self.saving) else {
            debug!(storage = %self.name, "save already in flight, skipping");
            return SaveOutcome::Skipped;
        };
        SaveOutcome::Completed(self.sweep().await)
    }

    /// Starts a sweep on the runtime and returns its handle, or `None` if
    /// one is already in flight.
    ///
    /// The in-flight marker is set before this returns, so an immediate
    /// second call is always a no-op.
    #[must_use = "dropping the handle detaches the sweep"]
    pub fn save_async(self: &Arc<Self>) -> Option<JoinHandle<SaveReport>> {
        let Some(guard) = SaveGuard::try_acquire(&self.saving) else {
            debug!(storage = %self.name, "save already in flight, skipping");
            return None;
        };
        let storage = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            storage.sweep().await
        }))
    }

    /// Saves from synchronous code, blocking until the sweep ends.
    ///
    /// Safe to call with or without a tokio runtime on the current thread;
    /// the sweep runs on its own runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Blocking`](crate::CoreError::Blocking) if the
    /// runtime could not be created or the sweep panicked.
    pub fn save_blocking(&self) -> CoreResult<SaveOutcome> {
        blocking::block_on(self.save())
    }

    fn is_removed(&self, key: &str) -> bool {
        self.removed.lock().contains(key)
    }

    async fn sweep(&self) -> SaveReport {
        self.removed.lock().clear();
        let snapshot: Vec<(String, Value)> = self
            .values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut report = SaveReport::default();
        for (key, value) in &snapshot {
            if self.is_removed(key) {
                debug!(storage = %self.name, key, "removed during sweep, skipping");
                continue;
            }
            match self.save_key(key, value).await {
                Ok(_) if self.is_removed(key) => {
                    debug!(storage = %self.name, key, "removed while saving, deleting again");
                    if let Err(e) = self.backend.delete(key).await {
                        error!(storage = %self.name, key, error = %e, "backend delete failed");
                    }
                }
                Ok(stats) => {
                    report.keys_saved += 1;
                    report.chunks_inserted += stats.inserted;
                    report.chunks_updated += stats.updated;
                    report.chunks_staged += stats.staged;
                    report.chunks_trimmed += stats.trimmed;
                }
                Err(e) => {
                    warn!(storage = %self.name, key, error = %e, "saving key failed");
                    report.keys_failed += 1;
                }
            }
            if self.config.yield_between_keys {
                tokio::task::yield_now().await;
            }
        }

        if let Err(e) = self.backend.flush().await {
            error!(storage = %self.name, error = %e, "flush failed");
            report.flush_failed = true;
        }

        debug!(storage = %self.name, %report, "save sweep finished");
        report
    }

    async fn save_key(&self, key: &str, value: &Value) -> Result<KeyStats, StorageError> {
        self.backend.ensure_container(key).await?;

        let payload = encode_value(value, &self.config.codec)?;
        let max_len = self
            .backend
            .max_chunk_len()
            .map_or(usize::MAX, |limit| limit.min(self.config.max_chunk_len));
        let chunks = chunk::split(&KeyCodec::fingerprint(key), &payload, max_len);

        let mut stats = KeyStats::default();
        for chunk in &chunks {
            match self.backend.upsert_chunk(key, chunk).await {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.updated += 1,
                Ok(UpsertOutcome::Staged) => stats.staged += 1,
                Err(e) => {
                    warn!(
                        storage = %self.name,
                        key,
                        chunk = chunk.sequence,
                        error = %e,
                        "writing chunk failed"
                    );
                    return Err(e);
                }
            }
        }
        stats.trimmed = self
            .backend
            .trim_chunks(key, chunks.len() as u64)
            .await?;
        Ok(stats)
    }
}
