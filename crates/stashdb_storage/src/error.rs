//! Error types for storage operations.

use stashdb_codec::CodecError;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A SQL statement reported failure.
    #[error("query failed: {reason}")]
    Query {
        /// Failure reason reported by the executor.
        reason: String,
    },

    /// A structured file could not be parsed or rendered.
    #[error("malformed {format} file: {message}")]
    Format {
        /// Format tag of the file.
        format: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The file extension does not map to a known format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Stored chunks are inconsistent.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The backend was asked to do something its medium cannot.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A payload failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Creates a query failure.
    pub fn query(reason: impl Into<String>) -> Self {
        Self::Query {
            reason: reason.into(),
        }
    }

    /// Creates a format error.
    pub fn format(format: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            format,
            message: message.into(),
        }
    }

    /// Returns true if the error means stored data is malformed, as
    /// opposed to the medium being unreachable.
    ///
    /// Malformed data must surface to callers; I/O failures are logged
    /// and treated as "the operation did not happen".
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::Corrupted(_) | Self::Codec(_)
        )
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_are_classified() {
        assert!(StorageError::format("json", "trailing comma").is_data_error());
        assert!(StorageError::Corrupted("gap".into()).is_data_error());
        assert!(StorageError::Codec(CodecError::InvalidUtf8).is_data_error());
        assert!(!StorageError::query("no such table").is_data_error());
        assert!(!StorageError::Io(io::Error::other("disk")).is_data_error());
    }

    #[test]
    fn error_display() {
        let err = StorageError::format("yaml", "bad indent");
        assert_eq!(err.to_string(), "malformed yaml file: bad indent");
    }
}
