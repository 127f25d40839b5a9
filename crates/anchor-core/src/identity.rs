//! # Processing Identifier
//!
//! The caller-assigned correlation key of one anchoring attempt. Opaque to
//! this service: any printable string up to [`ProcessingId::MAX_LEN`] bytes.
//!
//! The ledger takes the id as a `bytes32`. An id that is already a canonical
//! word, `0x` followed by exactly 64 lowercase hex digits, is passed through
//! as-is (this is what the relay generates). Any other id, including short or
//! mixed-case hex, is mapped to `sha256(utf8(id))`, so two distinct ids never
//! share a word.

use serde::{Deserialize, Serialize};

use crate::digest::{decode_prefixed_hex, sha256_raw, WORD_LEN};
use crate::error::ValidationError;

/// Caller-assigned correlation key, unique per anchoring attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProcessingId(String);

impl ProcessingId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 256;

    /// Validate a processing id.
    ///
    /// # Errors
    ///
    /// Rejects empty ids, ids longer than [`Self::MAX_LEN`] bytes, and ids
    /// containing whitespace or control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyProcessingId);
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError::ProcessingIdTooLong {
                len: s.len(),
                max: Self::MAX_LEN,
            });
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::ProcessingIdCharset);
        }
        Ok(Self(s))
    }

    /// Access the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `bytes32` value passed to the ledger for this id.
    pub fn word(&self) -> [u8; WORD_LEN] {
        if self.is_canonical_word() {
            if let Ok(bytes) = decode_prefixed_hex(&self.0) {
                if let Ok(word) = <[u8; WORD_LEN]>::try_from(bytes.as_slice()) {
                    return word;
                }
            }
        }
        sha256_raw(self.0.as_bytes())
    }

    fn is_canonical_word(&self) -> bool {
        self.0.len() == 2 + 2 * WORD_LEN
            && self.0.starts_with("0x")
            && self.0[2..]
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl<'de> Deserialize<'de> for ProcessingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ProcessingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
