//! Table-per-key relational backend.

use super::statements;
use super::{QueryResult, SqlDialect, SqlExecutor, Statement};
use crate::backend::{StorageBackend, UpsertOutcome};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use stashdb_codec::{Chunk, Fingerprint, KeyCodec, DEFAULT_MAX_CHUNK_LEN};
use std::sync::Arc;
use tracing::trace;

/// Options for a [`RelationalBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationalOptions {
    /// Dialect the executor must speak.
    pub dialect: SqlDialect,
    /// Adds a uniqueness constraint on the `value` column.
    ///
    /// Combined with `INSERT ... IGNORE`, two chunks with identical
    /// payloads would silently drop one, so this is off by default.
    pub unique_value_column: bool,
    /// Largest chunk payload in bytes.
    pub max_chunk_len: usize,
}

impl Default for RelationalOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Sqlite,
            unique_value_column: false,
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
        }
    }
}

impl RelationalOptions {
    /// Creates options for `dialect` with default settings.
    #[must_use]
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Sets whether the value column is unique.
    #[must_use]
    pub const fn unique_value_column(mut self, unique: bool) -> Self {
        self.unique_value_column = unique;
        self
    }

    /// Sets the largest chunk payload.
    #[must_use]
    pub const fn max_chunk_len(mut self, len: usize) -> Self {
        self.max_chunk_len = len;
        self
    }
}

/// Stores each key in its own table, one row per chunk.
///
/// Row schema is `(key, value)` where `key` is `<fingerprint>_<sequence>`.
/// Writes look the row up first and then `UPDATE` or `INSERT`, which
/// works on every dialect without native upsert syntax.
#[derive(Debug, Clone)]
pub struct RelationalBackend {
    executor: Arc<dyn SqlExecutor>,
    options: RelationalOptions,
}

impl RelationalBackend {
    /// Creates a backend over `executor`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidOperation`] if the executor speaks a
    /// different dialect than `options.dialect`.
    pub fn new(executor: Arc<dyn SqlExecutor>, options: RelationalOptions) -> StorageResult<Self> {
        if executor.dialect() != options.dialect {
            return Err(StorageError::InvalidOperation(format!(
                "executor speaks {}, storage expects {}",
                executor.dialect(),
                options.dialect
            )));
        }
        Ok(Self { executor, options })
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &RelationalOptions {
        &self.options
    }

    /// Returns the executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn SqlExecutor> {
        &self.executor
    }

    async fn run(&self, statement: Statement) -> StorageResult<QueryResult> {
        trace!(sql = %statement, "executing");
        let result = self.executor.execute(statement).await;
        if result.is_success() {
            Ok(result)
        } else {
            Err(StorageError::query(
                result.reason.unwrap_or_else(|| "unknown failure".to_string()),
            ))
        }
    }

    /// Sequence numbers of the rows in `table` belonging to `fingerprint`.
    async fn row_sequences(
        &self,
        table: &str,
        fingerprint: &Fingerprint,
    ) -> StorageResult<Vec<(u64, Option<String>)>> {
        let result = self.run(statements::select_all(table)).await?;
        let mut rows: Vec<_> = result
            .rows
            .into_iter()
            .filter_map(|row| {
                let (fp, sequence) = Fingerprint::parse_row_key(row.get("key")?)?;
                (&fp == fingerprint).then(|| (sequence, row.get("value").map(String::from)))
            })
            .collect();
        rows.sort_by_key(|(sequence, _)| *sequence);
        Ok(rows)
    }
}

#[async_trait]
impl StorageBackend for RelationalBackend {
    fn max_chunk_len(&self) -> Option<usize> {
        Some(self.options.max_chunk_len)
    }

    async fn ensure_container(&self, key: &str) -> StorageResult<()> {
        self.run(statements::create_table(
            self.options.dialect,
            key,
            self.options.unique_value_column,
        ))
        .await?;
        Ok(())
    }

    async fn read_chunks(&self, key: &str) -> StorageResult<Vec<Chunk>> {
        if !self.exists(key).await? {
            return Ok(Vec::new());
        }
        let fingerprint = KeyCodec::fingerprint(key);
        Ok(self
            .row_sequences(key, &fingerprint)
            .await?
            .into_iter()
            .map(|(sequence, payload)| {
                Chunk::new(fingerprint.clone(), sequence, payload.unwrap_or_default())
            })
            .collect())
    }

    async fn upsert_chunk(&self, key: &str, chunk: &Chunk) -> StorageResult<UpsertOutcome> {
        let row_key = chunk.row_key();
        let existing = self.run(statements::select_key(key, &row_key)).await?;
        if existing.rows.is_empty() {
            self.run(statements::insert(
                self.options.dialect,
                key,
                &row_key,
                &chunk.payload,
            ))
            .await?;
            Ok(UpsertOutcome::Inserted)
        } else {
            self.run(statements::update(key, &row_key, &chunk.payload))
                .await?;
            Ok(UpsertOutcome::Updated)
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let result = self
            .run(statements::table_exists(self.options.dialect, key))
            .await?;
        Ok(!result.rows.is_empty())
    }

    async fn trim_chunks(&self, key: &str, keep: u64) -> StorageResult<u64> {
        let fingerprint = KeyCodec::fingerprint(key);
        let mut trimmed = 0;
        for (sequence, _) in self.row_sequences(key, &fingerprint).await? {
            if sequence >= keep {
                self.run(statements::delete_row(key, &fingerprint.row_key(sequence)))
                    .await?;
                trimmed += 1;
            }
        }
        Ok(trimmed)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        self.run(statements::drop_table(key)).await?;
        Ok(true)
    }

    async fn containers(&self) -> StorageResult<Vec<String>> {
        let result = self.run(statements::list_tables(self.options.dialect)).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first().map(String::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqliteExecutor;

    fn backend() -> RelationalBackend {
        let exec = Arc::new(SqliteExecutor::open_in_memory().unwrap());
        RelationalBackend::new(exec, RelationalOptions::new(SqlDialect::Sqlite)).unwrap()
    }

    fn chunk(key: &str, sequence: u64, payload: &str) -> Chunk {
        Chunk::new(KeyCodec::fingerprint(key), sequence, payload)
    }

    #[test]
    fn dialect_mismatch_is_rejected() {
        let exec = Arc::new(SqliteExecutor::open_in_memory().unwrap());
        let result = RelationalBackend::new(exec, RelationalOptions::new(SqlDialect::MySql));
        assert!(matches!(result, Err(StorageError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn missing_table_reads_empty() {
        let backend = backend();
        assert!(!backend.exists("scores").await.unwrap());
        assert!(backend.read_chunks("scores").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_then_update() {
        let backend = backend();
        backend.ensure_container("scores").await.unwrap();
        backend.ensure_container("scores").await.unwrap();

        let first = backend.upsert_chunk("scores", &chunk("scores", 0, "a")).await;
        assert_eq!(first.unwrap(), UpsertOutcome::Inserted);
        let second = backend.upsert_chunk("scores", &chunk("scores", 0, "b")).await;
        assert_eq!(second.unwrap(), UpsertOutcome::Updated);

        assert_eq!(
            backend.read_chunks("scores").await.unwrap(),
            vec![chunk("scores", 0, "b")]
        );
    }

    #[tokio::test]
    async fn chunks_come_back_in_order_and_trim() {
        let backend = backend();
        backend.ensure_container("big").await.unwrap();
        for seq in [3, 1, 0, 2] {
            backend
                .upsert_chunk("big", &chunk("big", seq, &seq.to_string()))
                .await
                .unwrap();
        }
        let sequences: Vec<_> = backend
            .read_chunks("big")
            .await
            .unwrap()
            .iter()
            .map(|c| c.sequence)
            .collect();
        assert_eq!(sequences, [0, 1, 2, 3]);

        assert_eq!(backend.trim_chunks("big", 2).await.unwrap(), 2);
        assert_eq!(backend.read_chunks("big").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn upsert_without_table_fails() {
        let backend = backend();
        let result = backend.upsert_chunk("nope", &chunk("nope", 0, "x")).await;
        assert!(matches!(result, Err(StorageError::Query { .. })));
    }

    #[tokio::test]
    async fn awkward_keys_are_quoted() {
        let backend = backend();
        let key = "player`s data.v2";
        backend.ensure_container(key).await.unwrap();
        backend.upsert_chunk(key, &chunk(key, 0, "1")).await.unwrap();
        assert_eq!(backend.containers().await.unwrap(), [key]);
        assert!(backend.delete(key).await.unwrap());
        assert!(!backend.delete(key).await.unwrap());
        assert!(backend.containers().await.unwrap().is_empty());
    }
}
