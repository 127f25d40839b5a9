//! # Error Hierarchy
//!
//! [`AnchorError`] is the request-level taxonomy every anchoring failure is
//! reduced to before it leaves the service. [`ValidationError`] carries the
//! diagnostic detail for malformed input.
//!
//! Transport concerns (HTTP status codes, response envelopes) live in
//! `anchor-api`; nothing here knows about them.

use thiserror::Error;

/// Request-level error kinds for the anchoring lifecycle.
///
/// Every variant carries a human-readable detail. Use [`AnchorError::kind`]
/// for a stable, machine-readable code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// The signing identity could not be initialized. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed request payload. No durable state is created.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The signing identity is not ready yet. Recorded as a `FAILED` attempt.
    #[error("{0}")]
    Readiness(String),

    /// The ledger rejected the call, timed out, or was unreachable.
    /// Recorded as a `FAILED` attempt.
    #[error("submission error: {0}")]
    Submission(String),

    /// The durable store failed for a reason other than the expected
    /// duplicate-id no-op.
    #[error("store error: {0}")]
    Store(String),

    /// The processing id already exists in a state that forbids a new
    /// submission, or was reused with different hashes.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AnchorError {
    /// Stable machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Readiness(_) => "NOT_READY",
            Self::Submission(_) => "SUBMISSION_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Conflict(_) => "CONFLICT",
        }
    }

    /// Construct the readiness error surfaced while the signing identity is locked.
    pub fn not_ready() -> Self {
        Self::Readiness("Blockchain not ready".to_string())
    }
}

/// Validation errors for the anchoring domain newtypes.
///
/// Each variant carries the offending input (or its length) so operators can
/// diagnose a misbehaving upstream without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The processing id is missing or empty.
    #[error("processingId must not be empty")]
    EmptyProcessingId,

    /// The processing id exceeds the maximum accepted length.
    #[error("processingId is {len} bytes long (maximum {max})")]
    ProcessingIdTooLong {
        /// Actual length in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },

    /// The processing id contains whitespace or control characters.
    #[error("processingId must not contain whitespace or control characters")]
    ProcessingIdCharset,

    /// An evidence hash is not `0x`-prefixed hex of 1 to 32 bytes.
    #[error("invalid {field}: \"{value}\" ({reason})")]
    InvalidHash {
        /// Name of the request field.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A ledger transaction hash is not `0x` followed by 64 hex digits.
    #[error("invalid transaction hash: \"{0}\" (expected 0x followed by 64 hex digits)")]
    InvalidTxHash(String),

    /// A persisted status string is not one of `PENDING`, `SENT`, `FAILED`.
    #[error("unknown anchoring status: \"{0}\"")]
    UnknownStatus(String),

    /// The request body is not a JSON object of the expected shape.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}
