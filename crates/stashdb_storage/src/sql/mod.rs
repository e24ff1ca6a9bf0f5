//! Relational storage: the SQL executor contract, dialect-specific
//! statements, and the table-per-key backend built on top of them.

mod relational;
mod sqlite;
mod statements;

pub use relational::{RelationalBackend, RelationalOptions};
pub use sqlite::SqliteExecutor;

use async_trait::async_trait;
use std::fmt;

/// SQL flavour an executor speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    /// MySQL / MariaDB.
    MySql,
    /// SQLite 3.
    Sqlite,
}

impl SqlDialect {
    /// Returns the dialect name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A SQL statement with positional `?` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Values bound to the `?` placeholders, in order.
    pub params: Vec<String>,
}

impl Statement {
    /// Creates a statement without parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a bound parameter.
    #[must_use]
    pub fn bind(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Whether a statement succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// The statement ran.
    Success,
    /// The statement was rejected; see [`QueryResult::reason`].
    Failed,
}

/// One result row as `(column, value)` pairs. SQL `NULL` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Columns in select order.
    pub columns: Vec<(String, Option<String>)>,
}

impl Row {
    /// Returns the value of the named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns the value of the first column.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.columns.first().and_then(|(_, value)| value.as_deref())
    }
}

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Success or failure.
    pub status: QueryStatus,
    /// Rows returned by a query.
    pub rows: Vec<Row>,
    /// Failure reason when `status` is [`QueryStatus::Failed`].
    pub reason: Option<String>,
    /// Rows changed by a write.
    pub affected: u64,
}

impl QueryResult {
    /// A successful query returning `rows`.
    #[must_use]
    pub fn success(rows: Vec<Row>) -> Self {
        Self {
            status: QueryStatus::Success,
            rows,
            reason: None,
            affected: 0,
        }
    }

    /// A successful write that changed `affected` rows.
    #[must_use]
    pub fn affected(affected: u64) -> Self {
        Self {
            status: QueryStatus::Success,
            rows: Vec::new(),
            reason: None,
            affected,
        }
    }

    /// A failed statement.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Failed,
            rows: Vec::new(),
            reason: Some(reason.into()),
            affected: 0,
        }
    }

    /// Returns true if the statement succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

/// Something that runs SQL statements against one database.
///
/// Connection management is the executor's business. Failures are
/// reported in the [`QueryResult`], never as panics.
#[async_trait]
pub trait SqlExecutor: Send + Sync + fmt::Debug {
    /// The dialect statements must be written in.
    fn dialect(&self) -> SqlDialect;

    /// Runs a statement without blocking the caller's executor.
    async fn execute(&self, statement: Statement) -> QueryResult;

    /// Runs a statement on the current thread.
    fn execute_sync(&self, statement: &Statement) -> QueryResult;
}
