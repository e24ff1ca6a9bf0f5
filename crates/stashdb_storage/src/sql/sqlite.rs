//! SQLite executor backed by `rusqlite`.

use super::{QueryResult, Row, SqlDialect, SqlExecutor, Statement};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runs statements against one SQLite connection.
///
/// The connection is shared behind a mutex; async execution hops onto the
/// blocking pool so the caller's executor never waits on disk.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteExecutor {
    /// Opens (or creates) a database file in WAL mode, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(sql_error)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(sql_error)?;
        info!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file path, or `None` for an in-memory database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteExecutor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn sql_error(err: rusqlite::Error) -> StorageError {
    StorageError::query(err.to_string())
}

fn render(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn run(conn: &Connection, statement: &Statement) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(&statement.sql)?;
    let params = params_from_iter(statement.params.iter());

    if stmt.column_count() == 0 {
        let affected = stmt.execute(params)?;
        return Ok(QueryResult::affected(affected as u64));
    }

    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.push((name.clone(), render(row.get_ref(idx)?)));
        }
        out.push(Row { columns });
    }
    Ok(QueryResult::success(out))
}

fn run_locked(conn: &Mutex<Connection>, statement: &Statement) -> QueryResult {
    run(&conn.lock(), statement).unwrap_or_else(|e| QueryResult::failed(e.to_string()))
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn execute(&self, statement: Statement) -> QueryResult {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || run_locked(&conn, &statement))
            .await
            .unwrap_or_else(|e| QueryResult::failed(e.to_string()))
    }

    fn execute_sync(&self, statement: &Statement) -> QueryResult {
        run_locked(&self.conn, statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_then_reads() {
        let exec = SqliteExecutor::open_in_memory().unwrap();
        let created = exec
            .execute(Statement::new("CREATE TABLE t (k TEXT PRIMARY KEY, v TEXT)"))
            .await;
        assert!(created.is_success());

        let inserted = exec
            .execute(Statement::new("INSERT INTO t VALUES (?, ?)").bind("a").bind("1"))
            .await;
        assert_eq!(inserted.affected, 1);

        let selected = exec.execute_sync(&Statement::new("SELECT k, v, NULL AS n FROM t"));
        assert_eq!(selected.rows.len(), 1);
        assert_eq!(selected.rows[0].get("k"), Some("a"));
        assert_eq!(selected.rows[0].get("v"), Some("1"));
        assert_eq!(selected.rows[0].get("n"), None);
    }

    #[tokio::test]
    async fn errors_become_failed_results() {
        let exec = SqliteExecutor::open_in_memory().unwrap();
        let result = exec.execute(Statement::new("SELECT * FROM missing")).await;
        assert!(!result.is_success());
        assert!(result.reason.unwrap().contains("missing"));
    }

    #[test]
    fn open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b.db");
        let exec = SqliteExecutor::open(&path).unwrap();
        assert_eq!(exec.path(), Some(path.as_path()));
        assert!(path.exists());
        assert_eq!(exec.dialect(), SqlDialect::Sqlite);
    }
}
