//! Audit store error types.

use anchor_core::{AnchorError, AnchorStatus};

/// Errors from audit ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the processing id.
    #[error("audit record {0} not found")]
    NotFound(String),

    /// The record already reached a terminal status.
    #[error("audit record {processing_id} is already {status}")]
    AlreadyTerminal {
        /// The processing id.
        processing_id: String,
        /// The terminal status found.
        status: AnchorStatus,
    },

    /// A persisted row failed domain validation.
    #[error("audit record {processing_id} is corrupt: {reason}")]
    CorruptRow {
        /// The processing id of the row.
        processing_id: String,
        /// What failed to validate.
        reason: String,
    },

    /// The database rejected the operation or is unavailable.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StoreError> for AnchorError {
    fn from(err: StoreError) -> Self {
        AnchorError::Store(err.to_string())
    }
}
