//! Error types for stashdb core.

use stashdb_codec::CodecError;
use stashdb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by storages and the registry.
///
/// Backend I/O failures during loads and save sweeps are logged and
/// swallowed, so callers normally only see configuration errors and
/// decode errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A storage with this name is already registered.
    #[error("storage already exists: {name}")]
    DuplicateStorage {
        /// The conflicting name.
        name: String,
    },

    /// The storage kind cannot be backed with the given options.
    #[error("unsupported backend: {message}")]
    UnsupportedBackend {
        /// What is missing or mismatched.
        message: String,
    },

    /// A stored payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(CodecError),

    /// A backend operation failed.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// A blocking save could not be driven to completion.
    #[error("blocking save failed: {message}")]
    Blocking {
        /// What went wrong.
        message: String,
    },
}

impl CoreError {
    /// Creates an unsupported-backend error.
    pub fn unsupported_backend(message: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            message: message.into(),
        }
    }

    /// Creates a blocking-save error.
    pub fn blocking(message: impl Into<String>) -> Self {
        Self::Blocking {
            message: message.into(),
        }
    }

    /// Returns true for configuration errors (duplicate name, unsupported
    /// backend).
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStorage { .. } | Self::UnsupportedBackend { .. }
        )
    }

    /// Returns true if stored data is malformed.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        match self {
            Self::Decode(_) => true,
            Self::Storage(e) => e.is_data_error(),
            _ => false,
        }
    }
}

impl From<CodecError> for CoreError {
    fn from(err: CodecError) -> Self {
        Self::Decode(err)
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Codec(e) => Self::Decode(e),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_codec_errors_become_decode_errors() {
        let err = CoreError::from(StorageError::Codec(CodecError::NoChunks));
        assert!(matches!(err, CoreError::Decode(CodecError::NoChunks)));
        assert!(err.is_decode_error());
    }

    #[test]
    fn classification() {
        let dup = CoreError::DuplicateStorage {
            name: "players".into(),
        };
        assert!(dup.is_config_error());
        assert_eq!(dup.to_string(), "storage already exists: players");

        let format = CoreError::from(StorageError::format("json", "eof"));
        assert!(format.is_decode_error());
        assert!(!format.is_config_error());

        let io = CoreError::from(StorageError::query("gone away"));
        assert!(!io.is_decode_error());
    }
}
