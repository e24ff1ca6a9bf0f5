//! Named collection of storages.

use crate::blocking;
use crate::config::StorageOptions;
use crate::error::{CoreError, CoreResult};
use crate::storage::Storage;
use crate::types::{SaveOutcome, SaveReport, StorageKind};
use futures::future::join_all;
use indexmap::IndexMap;
use parking_lot::RwLock;
use stashdb_codec::Codec;
use stashdb_storage::{FileBackend, RelationalBackend, RelationalOptions, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Owns every storage of a process, keyed by unique name.
///
/// The registry is an ordinary value: create one at startup and hand it
/// (usually behind an `Arc`) to whatever needs storage lookup.
///
/// # Example
///
/// ```rust
/// use stashdb_core::{StorageKind, StorageOptions, StorageRegistry};
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = StorageRegistry::new();
/// let options = StorageOptions::new().path(dir.path().join("players.yml"));
///
/// let players = registry.create_storage("players", StorageKind::Detect, options).unwrap();
/// assert_eq!(players.kind(), StorageKind::Yaml);
/// assert!(registry.get_storage("players").is_some());
/// assert!(registry
///     .create_storage("players", StorageKind::Json, Default::default())
///     .is_err());
/// ```
#[derive(Debug, Default)]
pub struct StorageRegistry {
    storages: RwLock<IndexMap<String, Arc<Storage>>>,
}

impl StorageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a storage of `kind` and registers it under `name`.
    ///
    /// Flat-file kinds use `options.path`, falling back to `name` as the
    /// path. Relational kinds need `options.executor`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateStorage`] if `name` is taken; the registry
    ///   is left unchanged
    /// - [`CoreError::UnsupportedBackend`] if the kind cannot be built from
    ///   `options`
    pub fn create_storage(
        &self,
        name: impl Into<String>,
        kind: StorageKind,
        options: StorageOptions,
    ) -> CoreResult<Arc<Storage>> {
        let name = name.into();
        if self.contains(&name) {
            return Err(CoreError::DuplicateStorage { name });
        }

        let (kind, backend) = build_backend(&name, kind, &options)?;
        let mut config = options.config;
        if !kind.is_relational() {
            config.codec = Codec::Identity;
        }
        self.register(Storage::new(name, kind, backend, config))
    }

    /// Registers an already-built storage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateStorage`] if the name is taken.
    pub fn register(&self, storage: Storage) -> CoreResult<Arc<Storage>> {
        let mut storages = self.storages.write();
        if storages.contains_key(storage.name()) {
            return Err(CoreError::DuplicateStorage {
                name: storage.name().to_string(),
            });
        }
        let storage = Arc::new(storage);
        storages.insert(storage.name().to_string(), Arc::clone(&storage));
        info!(storage = storage.name(), kind = %storage.kind(), "storage registered");
        Ok(storage)
    }

    /// Looks a storage up by name.
    #[must_use]
    pub fn get_storage(&self, name: &str) -> Option<Arc<Storage>> {
        self.storages.read().get(name).cloned()
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.storages.read().contains_key(name)
    }

    /// Unregisters a storage and returns it. Unsaved data is not flushed.
    pub fn remove_storage(&self, name: &str) -> Option<Arc<Storage>> {
        let removed = self.storages.write().shift_remove(name);
        if removed.is_some() {
            debug!(storage = name, "storage removed");
        }
        removed
    }

    /// Unregisters every storage. Unsaved data is not flushed.
    pub fn clear_storages(&self) {
        self.storages.write().clear();
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.storages.read().keys().cloned().collect()
    }

    /// Number of registered storages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storages.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storages.read().is_empty()
    }

    fn storages(&self) -> Vec<Arc<Storage>> {
        self.storages.read().values().cloned().collect()
    }

    /// Saves every storage in turn, waiting for each sweep.
    pub async fn save_all(&self) -> Vec<(String, SaveOutcome)> {
        let mut outcomes = Vec::new();
        for storage in self.storages() {
            let outcome = storage.save().await;
            outcomes.push((storage.name().to_string(), outcome));
        }
        outcomes
    }

    /// Starts a sweep for every storage, yielding between storages, and
    /// waits for all of them.
    ///
    /// Storages whose previous sweep is still running report
    /// [`SaveOutcome::Skipped`].
    pub async fn save_all_async(&self) -> Vec<(String, SaveOutcome)> {
        let mut skipped = Vec::new();
        let mut pending = Vec::new();
        for storage in self.storages() {
            let name = storage.name().to_string();
            match storage.save_async() {
                Some(handle) => pending.push((name, handle)),
                None => skipped.push((name, SaveOutcome::Skipped)),
            }
            tokio::task::yield_now().await;
        }

        let (names, handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        let mut outcomes: Vec<(String, SaveOutcome)> = names
            .into_iter()
            .zip(join_all(handles).await)
            .filter_map(|(name, joined)| match joined {
                Ok(report) => Some((name, SaveOutcome::Completed(report))),
                Err(e) => {
                    error!(storage = %name, error = %e, "save task failed");
                    None
                }
            })
            .collect();
        outcomes.extend(skipped);
        outcomes
    }

    /// Saves every storage from synchronous code, blocking until done.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Blocking`] if the save could not be driven to
    /// completion.
    pub fn save_all_blocking(&self) -> CoreResult<Vec<(String, SaveOutcome)>> {
        blocking::block_on(self.save_all())
    }

    /// Runs a full save before a fatal error is raised, then hands the
    /// error back.
    ///
    /// ```rust,ignore
    /// if let Err(err) = run_host().await {
    ///     return Err(registry.flush_before_fatal(err).await);
    /// }
    /// ```
    pub async fn flush_before_fatal<E>(&self, err: E) -> E
    where
        E: std::fmt::Display,
    {
        error!(error = %err, storages = self.len(), "fatal error, flushing storages");
        log_final_flush(&self.save_all().await);
        err
    }

    /// Synchronous [`flush_before_fatal`](Self::flush_before_fatal) for
    /// panic hooks, signal handlers and other code that cannot await.
    ///
    /// ```rust,ignore
    /// if let Err(err) = run_host() {
    ///     return Err(registry.flush_before_fatal_blocking(err));
    /// }
    /// ```
    pub fn flush_before_fatal_blocking<E>(&self, err: E) -> E
    where
        E: std::fmt::Display,
    {
        error!(error = %err, storages = self.len(), "fatal error, flushing storages");
        match self.save_all_blocking() {
            Ok(outcomes) => log_final_flush(&outcomes),
            Err(e) => error!(error = %e, "final flush failed"),
        }
        err
    }
}

fn log_final_flush(outcomes: &[(String, SaveOutcome)]) {
    let mut total = SaveReport::default();
    for (_, outcome) in outcomes {
        if let Some(report) = outcome.report() {
            total.merge(report);
        }
    }
    info!(%total, "final flush finished");
}

fn build_backend(
    name: &str,
    kind: StorageKind,
    options: &StorageOptions,
) -> CoreResult<(StorageKind, Arc<dyn StorageBackend>)> {
    if let Some(dialect) = kind.dialect() {
        let executor = options.executor.clone().ok_or_else(|| {
            CoreError::unsupported_backend(format!("{kind} storage {name:?} needs a SQL executor"))
        })?;
        let relational = RelationalOptions::new(dialect)
            .unique_value_column(options.config.unique_value_column)
            .max_chunk_len(options.config.max_chunk_len);
        let backend = RelationalBackend::new(executor, relational)
            .map_err(|e| CoreError::unsupported_backend(e.to_string()))?;
        return Ok((kind, Arc::new(backend)));
    }

    let path = options
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(name));
    let backend = match kind.file_format() {
        Some(format) => FileBackend::new(path, format),
        None => FileBackend::detect(path).map_err(|e| CoreError::unsupported_backend(e.to_string()))?,
    };
    Ok((StorageKind::from_format(backend.format()), Arc::new(backend)))
}
