//! Resolves command-line flags into an open storage.

use clap::ValueEnum;
use stashdb_core::{Codec, Storage, StorageConfig, StorageKind, StorageOptions, StorageRegistry};
use stashdb_storage::{FileFormat, SqliteExecutor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name the opened storage is registered under.
const STORAGE_NAME: &str = "cli";

/// File formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// `key=value` lines
    Properties,
    /// JSON object
    Json,
    /// YAML mapping
    Yaml,
    /// CBOR map
    Serialized,
    /// One key per line
    Enum,
}

impl From<FormatArg> for FileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Properties => Self::Properties,
            FormatArg::Json => Self::Json,
            FormatArg::Yaml => Self::Yaml,
            FormatArg::Serialized => Self::Serialized,
            FormatArg::Enum => Self::Enum,
        }
    }
}

/// The medium a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A flat file.
    File {
        /// File path.
        path: PathBuf,
        /// Explicit format, or `None` to detect from the extension.
        format: Option<FileFormat>,
    },
    /// A SQLite database.
    Sqlite {
        /// Database path.
        path: PathBuf,
        /// Whether values are compressed.
        compress: bool,
    },
}

impl Target {
    /// Builds a target from the global flags.
    pub fn from_args(
        file: Option<PathBuf>,
        format: Option<FormatArg>,
        sqlite: Option<PathBuf>,
        compress: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match (file, sqlite) {
            (Some(path), None) => Ok(Self::File {
                path,
                format: format.map(FileFormat::from),
            }),
            (None, Some(path)) => Ok(Self::Sqlite { path, compress }),
            (None, None) => Err("one of --file or --sqlite is required".into()),
            (Some(_), Some(_)) => Err("--file and --sqlite cannot be combined".into()),
        }
    }

    /// Path of the file or database.
    pub fn path(&self) -> &Path {
        match self {
            Self::File { path, .. } | Self::Sqlite { path, .. } => path,
        }
    }

    /// The storage kind this target opens as.
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::File { format: None, .. } => StorageKind::Detect,
            Self::File {
                format: Some(format),
                ..
            } => StorageKind::from_format(*format),
            Self::Sqlite { .. } => StorageKind::Sqlite,
        }
    }

    /// Opens the storage.
    pub fn open(&self) -> Result<Arc<Storage>, Box<dyn std::error::Error>> {
        let registry = StorageRegistry::new();
        let options = match self {
            Self::File { path, .. } => StorageOptions::new().path(path),
            Self::Sqlite { path, compress } => {
                let mut config = StorageConfig::new();
                if *compress {
                    config = config.codec(Codec::Compress);
                }
                StorageOptions::new()
                    .executor(Arc::new(SqliteExecutor::open(path)?))
                    .config(config)
            }
        };
        Ok(registry.create_storage(STORAGE_NAME, self.kind(), options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_without_format_detects() {
        let target = Target::from_args(Some("a.yml".into()), None, None, false).unwrap();
        assert_eq!(target.kind(), StorageKind::Detect);
        assert_eq!(target.path(), Path::new("a.yml"));
    }

    #[test]
    fn explicit_format_wins() {
        let target =
            Target::from_args(Some("a.txt".into()), Some(FormatArg::Json), None, false).unwrap();
        assert_eq!(target.kind(), StorageKind::Json);
    }

    #[test]
    fn needs_exactly_one_medium() {
        assert!(Target::from_args(None, None, None, false).is_err());
        assert!(Target::from_args(Some("a".into()), None, Some("b".into()), false).is_err());
    }

    #[test]
    fn opens_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::from_args(None, None, Some(dir.path().join("s.db")), true).unwrap();
        let storage = target.open().unwrap();
        assert_eq!(storage.kind(), StorageKind::Sqlite);
    }
}
