//! # Hashes and Ledger Words
//!
//! The ledger's anchoring entry point takes three `bytes32` arguments.
//! [`EvidenceHash`] accepts the caller's `0x`-prefixed hex (1 to 32 bytes)
//! and exposes the 32-byte word the contract receives. Shorter values are
//! right-padded with zeros, matching Solidity `bytes32` alignment.
//!
//! [`TxHash`] is the transaction identifier returned by the node on
//! acceptance: `0x` followed by exactly 64 hex digits.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Length in bytes of a ledger word (`bytes32`).
pub const WORD_LEN: usize = 32;

/// Render bytes as lowercase hex without a prefix.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compute a raw SHA-256 digest.
pub fn sha256_raw(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Decode a `0x`-prefixed hex string into bytes.
///
/// Returns the reason string on failure so callers can build their own
/// [`ValidationError`] variant.
pub(crate) fn decode_prefixed_hex(value: &str) -> Result<Vec<u8>, &'static str> {
    let digits = value.strip_prefix("0x").ok_or("missing 0x prefix")?;
    if digits.is_empty() {
        return Err("no hex digits after 0x");
    }
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits");
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("non-hex character");
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| "non-hex character"))
        .collect()
}

/// Right-pad up to 32 bytes into a ledger word.
pub(crate) fn pad_word(bytes: &[u8]) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[..bytes.len()].copy_from_slice(bytes);
    word
}

/// A content hash submitted as evidence (`sourceHash` / `resultHash`).
///
/// Stored in its lowercase textual form; [`EvidenceHash::word`] is the
/// value sent on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct EvidenceHash {
    text: String,
    word: [u8; WORD_LEN],
}

impl EvidenceHash {
    /// Parse a hash value, naming `field` in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHash`] unless the value is `0x`
    /// followed by an even number (2 to 64) of hex digits.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidHash {
            field,
            value: value.to_string(),
            reason,
        };
        let bytes = decode_prefixed_hex(value).map_err(invalid)?;
        if bytes.len() > WORD_LEN {
            return Err(invalid("longer than 32 bytes"));
        }
        Ok(Self {
            text: value.to_ascii_lowercase(),
            word: pad_word(&bytes),
        })
    }

    /// Parse a hash value with a generic field name.
    pub fn new(value: &str) -> Result<Self, ValidationError> {
        Self::parse("hash", value)
    }

    /// The normalized (lowercase) textual form.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The 32-byte ledger word.
    pub fn word(&self) -> &[u8; WORD_LEN] {
        &self.word
    }
}

impl From<EvidenceHash> for String {
    fn from(value: EvidenceHash) -> Self {
        value.text
    }
}

impl<'de> Deserialize<'de> for EvidenceHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for EvidenceHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A ledger transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TxHash(String);

impl TxHash {
    /// Validate a transaction hash (`0x` + 64 hex digits), normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTxHash`] on any other shape.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        match decode_prefixed_hex(&s) {
            Ok(bytes) if bytes.len() == WORD_LEN => Ok(Self(s.to_ascii_lowercase())),
            _ => Err(ValidationError::InvalidTxHash(s)),
        }
    }

    /// Access the hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
