//! Key fingerprints.
//!
//! Arbitrary logical keys are mapped to a fixed-width digest before they
//! reach a backend, so any key string is safe as a physical row key.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length in characters of every [`Fingerprint`].
pub const FINGERPRINT_LEN: usize = 64;

/// Separator between a fingerprint and a chunk index in a row key.
const ROW_KEY_SEPARATOR: char = '_';

/// Fixed-width, deterministic digest of a logical key.
///
/// Rendered as 64 lowercase hexadecimal characters (SHA-256). Collisions
/// are treated as negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the physical row key for chunk `sequence` of this key.
    #[must_use]
    pub fn row_key(&self, sequence: u64) -> String {
        format!("{}{ROW_KEY_SEPARATOR}{sequence}", self.0)
    }

    /// Splits a physical row key back into fingerprint and chunk index.
    ///
    /// Returns `None` for anything that was not produced by [`row_key`](Self::row_key).
    #[must_use]
    pub fn parse_row_key(row_key: &str) -> Option<(Self, u64)> {
        let (digest, sequence) = row_key.split_once(ROW_KEY_SEPARATOR)?;
        if digest.len() != FINGERPRINT_LEN || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let sequence = sequence.parse().ok()?;
        Some((Self(digest.to_ascii_lowercase()), sequence))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives fingerprints from logical keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    /// Computes the fingerprint of a logical key.
    #[must_use]
    pub fn fingerprint(key: &str) -> Fingerprint {
        let digest = Sha256::digest(key.as_bytes());
        Fingerprint(hex::encode(digest))
    }
}
