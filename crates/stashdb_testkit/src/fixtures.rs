//! Test fixtures and storage helpers.
//!
//! Provides ready-made storages over temporary files and databases.

use stashdb_core::{Storage, StorageConfig, StorageKind, StorageOptions, StorageRegistry};
use stashdb_storage::{SqlExecutor, SqliteExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A registered storage with automatic cleanup of its files.
pub struct TestStorage {
    /// The registry owning the storage.
    pub registry: StorageRegistry,
    /// The storage instance.
    pub storage: Arc<Storage>,
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStorage {
    /// Creates a storage over a temporary JSON file.
    pub fn json() -> Self {
        Self::file("data.json", StorageKind::Json)
    }

    /// Creates a storage over a temporary YAML file.
    pub fn yaml() -> Self {
        Self::file("data.yml", StorageKind::Yaml)
    }

    /// Creates a storage over a temporary file named `file_name`.
    pub fn file(file_name: &str, kind: StorageKind) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(file_name);
        let options = StorageOptions::new().path(&path);
        Self::build(temp_dir, path, kind, options)
    }

    /// Creates a storage over a temporary SQLite database file.
    pub fn sqlite() -> Self {
        Self::sqlite_with(StorageConfig::default())
    }

    /// Creates a storage over a temporary SQLite database file with a
    /// custom configuration.
    pub fn sqlite_with(config: StorageConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("data.db");
        let executor = SqliteExecutor::open(&path).expect("Failed to open SQLite database");
        let options = StorageOptions::new()
            .executor(Arc::new(executor))
            .config(config);
        Self::build(temp_dir, path, StorageKind::Sqlite, options)
    }

    /// Creates a relational storage over `executor`.
    pub fn relational(executor: Arc<dyn SqlExecutor>, config: StorageConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().to_path_buf();
        let options = StorageOptions::new().executor(executor).config(config);
        Self::build(temp_dir, path, StorageKind::Sqlite, options)
    }

    fn build(temp_dir: TempDir, path: PathBuf, kind: StorageKind, options: StorageOptions) -> Self {
        let registry = StorageRegistry::new();
        let storage = registry
            .create_storage("test", kind, options)
            .expect("Failed to create storage");
        Self {
            registry,
            storage,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// The file or database path backing the storage.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::ops::Deref for TestStorage {
    type Target = Storage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_fixture_persists() {
        let storage = TestStorage::json();
        storage.set("k", json!({"a": 1}));
        storage.save().await;
        assert!(storage.path().exists());
        assert_eq!(storage.kind(), StorageKind::Json);
    }

    #[tokio::test]
    async fn sqlite_fixture_round_trips() {
        let storage = TestStorage::sqlite();
        storage.set("k", json!([1, 2]));
        storage.save().await;
        storage.clear_data();
        assert_eq!(storage.get_async("k").await.unwrap(), Some(json!([1, 2])));
    }
}
