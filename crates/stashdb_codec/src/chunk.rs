//! Splitting encoded payloads into size-bounded chunks.
//!
//! A logical value's encoded text is split into an ordered sequence of
//! [`Chunk`]s whose sequence numbers are contiguous from zero. Reassembly is
//! the concatenation of payloads in sequence order.
//!
//! Chunk boundaries always fall on UTF-8 character boundaries, so every
//! payload is itself valid text and can be stored in a text column.

use crate::error::{CodecError, CodecResult};
use crate::key::Fingerprint;

/// Default upper bound on a chunk payload, in bytes.
pub const DEFAULT_MAX_CHUNK_LEN: usize = u32::MAX as usize;

/// One ordered, size-bounded slice of an encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Fingerprint of the logical key this chunk belongs to.
    pub fingerprint: Fingerprint,
    /// Position of this chunk, starting at zero.
    pub sequence: u64,
    /// The chunk's slice of the encoded payload.
    pub payload: String,
}

impl Chunk {
    /// Creates a chunk.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            fingerprint,
            sequence,
            payload: payload.into(),
        }
    }

    /// Physical row key (`<fingerprint>_<sequence>`).
    #[must_use]
    pub fn row_key(&self) -> String {
        self.fingerprint.row_key(self.sequence)
    }
}

/// Splits `payload` into chunks of at most `max_len` bytes.
///
/// An empty payload yields a single empty chunk so every stored value has
/// a chunk zero. If `max_len` is smaller than the next character, that
/// character still forms a chunk on its own.
#[must_use]
pub fn split(fingerprint: &Fingerprint, payload: &str, max_len: usize) -> Vec<Chunk> {
    if payload.is_empty() {
        return vec![Chunk::new(fingerprint.clone(), 0, String::new())];
    }

    let max_len = max_len.max(1);
    let mut chunks = Vec::with_capacity(payload.len() / max_len + 1);
    let mut rest = payload;
    let mut sequence = 0u64;

    while !rest.is_empty() {
        let mut end = max_len.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // limit is narrower than one character
            end = rest
                .char_indices()
                .nth(1)
                .map_or(rest.len(), |(idx, _)| idx);
        }

        let (head, tail) = rest.split_at(end);
        chunks.push(Chunk::new(fingerprint.clone(), sequence, head));
        sequence += 1;
        rest = tail;
    }

    chunks
}

/// Concatenates chunk payloads in sequence order.
///
/// Chunks may be supplied in any order; they are sorted first.
///
/// # Errors
///
/// Returns [`CodecError::NoChunks`] for an empty input and
/// [`CodecError::ChunkSequence`] if sequence numbers are not contiguous
/// from zero.
pub fn reassemble(chunks: impl IntoIterator<Item = Chunk>) -> CodecResult<String> {
    let mut chunks: Vec<Chunk> = chunks.into_iter().collect();
    if chunks.is_empty() {
        return Err(CodecError::NoChunks);
    }
    chunks.sort_by_key(|c| c.sequence);

    let total = chunks.iter().map(|c| c.payload.len()).sum();
    let mut out = String::with_capacity(total);
    for (expected, chunk) in (0u64..).zip(&chunks) {
        if chunk.sequence != expected {
            return Err(CodecError::ChunkSequence {
                expected,
                found: chunk.sequence,
            });
        }
        out.push_str(&chunk.payload);
    }
    Ok(out)
}
