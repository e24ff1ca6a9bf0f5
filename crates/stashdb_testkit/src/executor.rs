//! SQL executors for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use stashdb_storage::{QueryResult, SqlDialect, SqlExecutor, SqliteExecutor, Statement};

/// A statement-recording executor over a private in-memory SQLite
/// database.
///
/// Statements really run, so storages behave normally, and every
/// statement is kept for later assertions.
#[derive(Debug)]
pub struct RecordingExecutor {
    inner: SqliteExecutor,
    log: Mutex<Vec<Statement>>,
}

impl RecordingExecutor {
    /// Creates an executor over a fresh in-memory database.
    ///
    /// # Panics
    ///
    /// Panics if SQLite cannot open an in-memory database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: SqliteExecutor::open_in_memory().expect("Failed to open in-memory SQLite"),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every statement run so far, oldest first.
    #[must_use]
    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().clone()
    }

    /// The SQL text of every statement run so far.
    #[must_use]
    pub fn sql_log(&self) -> Vec<String> {
        self.log.lock().iter().map(|s| s.sql.clone()).collect()
    }

    /// The leading verb of every statement (`CREATE`, `SELECT`, ...).
    #[must_use]
    pub fn verbs(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .map(|s| {
                s.sql
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_uppercase()
            })
            .collect()
    }

    /// Forgets recorded statements.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn execute(&self, statement: Statement) -> QueryResult {
        self.log.lock().push(statement.clone());
        self.inner.execute(statement).await
    }

    fn execute_sync(&self, statement: &Statement) -> QueryResult {
        self.log.lock().push(statement.clone());
        self.inner.execute_sync(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_runs() {
        let exec = RecordingExecutor::new();
        exec.execute(Statement::new("CREATE TABLE t (a TEXT)")).await;
        let result = exec.execute_sync(&Statement::new("select a from t"));

        assert!(result.is_success());
        assert_eq!(exec.verbs(), ["CREATE", "SELECT"]);
        assert_eq!(exec.statements().len(), 2);

        exec.clear();
        assert!(exec.sql_log().is_empty());
    }
}
