//! Flat structured-file backend.
//!
//! The whole file is one container: every key is a top-level entry of the
//! file's document and values are stored natively (no chunking, no codec).
//! Writes are staged in memory and merged over the on-disk document on
//! [`flush`](crate::StorageBackend::flush), so keys written by someone else
//! survive and staged keys win on conflict.

mod format;

pub use format::{Document, FileFormat, StructuredFile};

use crate::backend::{ContainerChunks, StorageBackend, UpsertOutcome};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use serde_json::Value;
use stashdb_codec::{Chunk, KeyCodec};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Backend storing every key in one structured file.
///
/// Chunks carry the JSON text of a whole value and only sequence zero is
/// accepted.
///
/// # Concurrency
///
/// Flushes take an exclusive advisory lock on a sibling `<file>.lock` so
/// two processes never interleave their read-merge-write cycles.
#[derive(Debug, Clone)]
pub struct FileBackend {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    format: FileFormat,
    staged: Mutex<Document>,
}

impl FileBackend {
    /// Creates a backend for `path` in the given format. The file is not
    /// touched until the first read or flush.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                format,
                staged: Mutex::new(Document::new()),
            }),
        }
    }

    /// Creates a backend whose format is picked from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedFormat`] for an unknown extension.
    pub fn detect(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let format = FileFormat::detect(&path)?;
        Ok(Self::new(path, format))
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns the file format.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.inner.format
    }

    /// Number of writes waiting for the next flush.
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.inner.staged.lock().len()
    }

    /// Reads the current on-disk document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn read_document(&self) -> StorageResult<Document> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.open().map(|f| f.get_all().clone())).await?
    }

    /// The on-disk document with staged writes laid over it.
    async fn merged_document(&self) -> StorageResult<Document> {
        let mut document = self.read_document().await?;
        for (key, value) in self.inner.staged.lock().iter() {
            document.insert(key.clone(), value.clone());
        }
        Ok(document)
    }

    async fn read_value(&self, key: &str) -> StorageResult<Option<Value>> {
        let staged = self.inner.staged.lock().get(key).cloned();
        if staged.is_some() {
            return Ok(staged);
        }
        let key = key.to_string();
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut file = inner.open()?;
            Ok(file.document_mut().shift_remove(&key))
        })
        .await?
    }
}

impl Inner {
    fn open(&self) -> StorageResult<StructuredFile> {
        StructuredFile::open(&self.path, self.format)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn lock(&self) -> StorageResult<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    /// Read-modify-write under the file lock.
    fn modify<T>(&self, f: impl FnOnce(&mut Document) -> T) -> StorageResult<T> {
        let lock = self.lock()?;
        let mut file = self.open()?;
        let out = f(file.document_mut());
        let result = file.save();
        // closing the handle releases the lock
        drop(lock);
        result.map(|()| out)
    }

    fn flush(&self) -> StorageResult<usize> {
        let staged = std::mem::take(&mut *self.staged.lock());
        if staged.is_empty() {
            return Ok(0);
        }
        let count = staged.len();
        let merged = self.modify(|document| {
            for (key, value) in &staged {
                document.insert(key.clone(), value.clone());
            }
        });
        if merged.is_err() {
            // put the writes back so the next flush retries them
            let mut pending = self.staged.lock();
            for (key, value) in staged {
                pending.entry(key).or_insert(value);
            }
        }
        merged.map(|()| count)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn max_chunk_len(&self) -> Option<usize> {
        None
    }

    async fn ensure_container(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn read_chunks(&self, key: &str) -> StorageResult<Vec<Chunk>> {
        let Some(value) = self.read_value(key).await? else {
            return Ok(Vec::new());
        };
        Ok(vec![Chunk::new(
            KeyCodec::fingerprint(key),
            0,
            value.to_string(),
        )])
    }

    async fn upsert_chunk(&self, key: &str, chunk: &Chunk) -> StorageResult<UpsertOutcome> {
        if chunk.sequence != 0 {
            return Err(StorageError::InvalidOperation(format!(
                "file storage holds whole values, got chunk {} for {key:?}",
                chunk.sequence
            )));
        }
        let value: Value = serde_json::from_str(&chunk.payload)
            .map_err(|e| StorageError::format(self.inner.format.name(), e.to_string()))?;
        self.inner.staged.lock().insert(key.to_string(), value);
        Ok(UpsertOutcome::Staged)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        if self.inner.staged.lock().contains_key(key) {
            return Ok(true);
        }
        Ok(self.read_value(key).await?.is_some())
    }

    async fn trim_chunks(&self, _key: &str, _keep: u64) -> StorageResult<u64> {
        Ok(0)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let staged = self.inner.staged.lock().shift_remove(key).is_some();
        let key = key.to_string();
        let inner = Arc::clone(&self.inner);
        let on_disk =
            tokio::task::spawn_blocking(move || inner.modify(|doc| doc.shift_remove(&key).is_some()))
                .await??;
        Ok(staged || on_disk)
    }

    async fn containers(&self) -> StorageResult<Vec<String>> {
        Ok(self.merged_document().await?.into_keys().collect())
    }

    async fn read_all_chunks(&self) -> StorageResult<Vec<ContainerChunks>> {
        Ok(self
            .merged_document()
            .await?
            .into_iter()
            .map(|(key, value)| {
                let chunk = Chunk::new(KeyCodec::fingerprint(&key), 0, value.to_string());
                (key, Ok(vec![chunk]))
            })
            .collect())
    }

    async fn flush(&self) -> StorageResult<()> {
        let inner = Arc::clone(&self.inner);
        let written = tokio::task::spawn_blocking(move || inner.flush()).await??;
        if written > 0 {
            debug!(path = %self.inner.path.display(), keys = written, "flushed file storage");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn whole(key: &str, value: &Value) -> Chunk {
        Chunk::new(KeyCodec::fingerprint(key), 0, value.to_string())
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("data.json"), FileFormat::Json);
        assert!(backend.read_chunks("x").await.unwrap().is_empty());
        assert!(!backend.exists("x").await.unwrap());
        assert!(backend.containers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_merges_over_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"x": 1, "y": 0}"#).unwrap();

        let backend = FileBackend::new(&path, FileFormat::Json);
        backend.upsert_chunk("y", &whole("y", &json!(2))).await.unwrap();
        assert_eq!(backend.staged_len(), 1);
        backend.flush().await.unwrap();
        assert_eq!(backend.staged_len(), 0);

        let document = backend.read_document().await.unwrap();
        assert_eq!(serde_json::to_value(&document).unwrap(), json!({"x": 1, "y": 2}));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn read_chunks_returns_whole_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.yml");
        fs::write(&path, "scores:\n  alice: 10\n").unwrap();

        let backend = FileBackend::detect(&path).unwrap();
        assert_eq!(backend.format(), FileFormat::Yaml);
        let chunks = backend.read_chunks("scores").await.unwrap();
        assert_eq!(chunks, vec![whole("scores", &json!({"alice": 10}))]);
    }

    #[tokio::test]
    async fn rejects_later_chunks() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("d.json"), FileFormat::Json);
        let chunk = Chunk::new(KeyCodec::fingerprint("k"), 1, "1");
        assert!(matches!(
            backend.upsert_chunk("k", &chunk).await,
            Err(StorageError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_staged_and_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(&path, r#"{"a": 1, "b": 2}"#).unwrap();

        let backend = FileBackend::new(&path, FileFormat::Json);
        assert!(backend.delete("a").await.unwrap());
        assert!(!backend.delete("a").await.unwrap());
        assert_eq!(backend.containers().await.unwrap(), ["b"]);
    }

    #[tokio::test]
    async fn bulk_read_parses_once_and_sees_staged_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(&path, r#"{"a": 1, "b": 2}"#).unwrap();

        let backend = FileBackend::new(&path, FileFormat::Json);
        backend.upsert_chunk("b", &whole("b", &json!(20))).await.unwrap();
        backend.upsert_chunk("c", &whole("c", &json!(3))).await.unwrap();

        let entries = backend.read_all_chunks().await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        let (_, b) = &entries[1];
        assert_eq!(b.as_ref().unwrap(), &vec![whole("b", &json!(20))]);

        assert_eq!(backend.read_chunks("c").await.unwrap(), vec![whole("c", &json!(3))]);
        assert_eq!(backend.containers().await.unwrap(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn bulk_read_of_malformed_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(&path, "{ nope").unwrap();
        let backend = FileBackend::new(&path, FileFormat::Json);
        assert!(backend.read_all_chunks().await.unwrap_err().is_data_error());
    }

    #[tokio::test]
    async fn detect_rejects_unknown_extension() {
        assert!(FileBackend::detect("data.bin").is_err());
    }

    #[tokio::test]
    async fn flush_without_writes_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.json");
        let backend = FileBackend::new(&path, FileFormat::Json);
        backend.flush().await.unwrap();
        assert!(!path.exists());
    }
}
