//! # Audit Records
//!
//! One [`AuditRecord`] exists per processing id. It is created `PENDING`
//! before any ledger call and moves exactly once to `SENT` (with a
//! transaction hash) or `FAILED`. Records are never deleted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::{EvidenceHash, TxHash};
use crate::error::ValidationError;
use crate::identity::ProcessingId;

/// Anchoring status of an audit record.
///
/// `Sent` and `Failed` are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnchorStatus {
    /// Durably recorded, ledger outcome not yet known.
    Pending,
    /// The ledger accepted the transaction for broadcast.
    Sent,
    /// The attempt was rejected, timed out, or never reached the ledger.
    Failed,
}

impl AnchorStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [AnchorStatus; 3] = [Self::Pending, Self::Sent, Self::Failed];

    /// The persisted / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl FromStr for AnchorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated anchoring request: the processing id and its hash pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceSubmission {
    /// Caller-assigned correlation key.
    pub processing_id: ProcessingId,
    /// Hash of the source evidence.
    pub source_hash: EvidenceHash,
    /// Hash of the processing result.
    pub result_hash: EvidenceHash,
}

impl EvidenceSubmission {
    /// Validate raw request fields, naming the offending field on error.
    pub fn parse(
        processing_id: &str,
        source_hash: &str,
        result_hash: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            processing_id: ProcessingId::new(processing_id)?,
            source_hash: EvidenceHash::parse("sourceHash", source_hash)?,
            result_hash: EvidenceHash::parse("resultHash", result_hash)?,
        })
    }
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Caller-assigned correlation key (unique, immutable).
    pub processing_id: ProcessingId,
    /// Source evidence hash (immutable).
    pub source_hash: EvidenceHash,
    /// Result hash (immutable).
    pub result_hash: EvidenceHash,
    /// Ledger transaction; present iff `status == SENT`.
    pub tx_hash: Option<TxHash>,
    /// Current lifecycle status.
    pub status: AnchorStatus,
    /// When the attempt was first recorded.
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// A fresh `PENDING` record for a submission.
    pub fn pending(submission: &EvidenceSubmission, created_at: DateTime<Utc>) -> Self {
        Self {
            processing_id: submission.processing_id.clone(),
            source_hash: submission.source_hash.clone(),
            result_hash: submission.result_hash.clone(),
            tx_hash: None,
            status: AnchorStatus::Pending,
            created_at,
        }
    }

    /// Whether this record was created for the same hash pair.
    pub fn matches(&self, submission: &EvidenceSubmission) -> bool {
        self.source_hash == submission.source_hash && self.result_hash == submission.result_hash
    }
}
