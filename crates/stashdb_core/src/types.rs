//! Core type definitions for stashdb.

use serde::Serialize;
use stashdb_storage::{FileFormat, SqlDialect};
use std::fmt;

/// What kind of medium backs a storage.
///
/// The numeric codes are stable and used by hosts that configure storages
/// from plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Flat file whose format is picked from the extension.
    Detect,
    /// `key=value` properties file.
    Properties,
    /// JSON file.
    Json,
    /// YAML file.
    Yaml,
    /// CBOR file.
    Serialized,
    /// One key per line.
    Enum,
    /// MySQL database.
    MySql,
    /// SQLite database.
    Sqlite,
}

impl StorageKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 8] = [
        Self::Detect,
        Self::Properties,
        Self::Json,
        Self::Yaml,
        Self::Serialized,
        Self::Enum,
        Self::MySql,
        Self::Sqlite,
    ];

    /// Looks a kind up by numeric code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Detect),
            0 => Some(Self::Properties),
            1 => Some(Self::Json),
            2 => Some(Self::Yaml),
            3 => Some(Self::Serialized),
            4 => Some(Self::Enum),
            5 => Some(Self::MySql),
            6 => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Detect => -1,
            Self::Properties => 0,
            Self::Json => 1,
            Self::Yaml => 2,
            Self::Serialized => 3,
            Self::Enum => 4,
            Self::MySql => 5,
            Self::Sqlite => 6,
        }
    }

    /// Returns true for the SQL kinds.
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(self, Self::MySql | Self::Sqlite)
    }

    /// File format for the fixed flat-file kinds. `None` for
    /// [`Detect`](Self::Detect) and the relational kinds.
    #[must_use]
    pub const fn file_format(self) -> Option<FileFormat> {
        match self {
            Self::Properties => Some(FileFormat::Properties),
            Self::Json => Some(FileFormat::Json),
            Self::Yaml => Some(FileFormat::Yaml),
            Self::Serialized => Some(FileFormat::Serialized),
            Self::Enum => Some(FileFormat::Enum),
            Self::Detect | Self::MySql | Self::Sqlite => None,
        }
    }

    /// SQL dialect for the relational kinds.
    #[must_use]
    pub const fn dialect(self) -> Option<SqlDialect> {
        match self {
            Self::MySql => Some(SqlDialect::MySql),
            Self::Sqlite => Some(SqlDialect::Sqlite),
            _ => None,
        }
    }

    /// The kind matching a file format.
    #[must_use]
    pub const fn from_format(format: FileFormat) -> Self {
        match format {
            FileFormat::Properties => Self::Properties,
            FileFormat::Json => Self::Json,
            FileFormat::Yaml => Self::Yaml,
            FileFormat::Serialized => Self::Serialized,
            FileFormat::Enum => Self::Enum,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detect => "detect",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            other => match other.file_format() {
                Some(format) => format.name(),
                None => "unknown",
            },
        };
        f.write_str(name)
    }
}

/// Counters for one save sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Keys fully written.
    pub keys_saved: u64,
    /// Keys skipped after a backend or encode failure.
    pub keys_failed: u64,
    /// Chunks written as new rows.
    pub chunks_inserted: u64,
    /// Chunks that overwrote an existing row.
    pub chunks_updated: u64,
    /// Chunks buffered for the final flush.
    pub chunks_staged: u64,
    /// Stale tail chunks deleted.
    pub chunks_trimmed: u64,
    /// Whether the final flush failed.
    pub flush_failed: bool,
}

impl SaveReport {
    /// Returns true if every key was written and the flush succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.keys_failed == 0 && !self.flush_failed
    }

    /// Adds another report's counters to this one.
    pub fn merge(&mut self, other: &Self) {
        self.keys_saved += other.keys_saved;
        self.keys_failed += other.keys_failed;
        self.chunks_inserted += other.chunks_inserted;
        self.chunks_updated += other.chunks_updated;
        self.chunks_staged += other.chunks_staged;
        self.chunks_trimmed += other.chunks_trimmed;
        self.flush_failed |= other.flush_failed;
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} saved, {} failed, {} inserted, {} updated, {} staged, {} trimmed",
            self.keys_saved,
            self.keys_failed,
            self.chunks_inserted,
            self.chunks_updated,
            self.chunks_staged,
            self.chunks_trimmed
        )?;
        if self.flush_failed {
            f.write_str(", flush failed")?;
        }
        Ok(())
    }
}

/// Result of asking a storage to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A sweep ran.
    Completed(SaveReport),
    /// Another sweep was already in flight; nothing was done.
    Skipped,
}

impl SaveOutcome {
    /// Returns true if the save was a no-op.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// The sweep report, if a sweep ran.
    #[must_use]
    pub const fn report(&self) -> Option<&SaveReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }
}
