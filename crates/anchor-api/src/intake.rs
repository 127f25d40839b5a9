//! # Intake Service
//!
//! Drives one anchoring request through the audit state machine:
//!
//! ```text
//! validate ─► lock(id) ─► find(id) ──existing──► duplicate policy
//!                             │
//!                          absent
//!                             ▼
//!                      create PENDING ─► ready? ─no─► FAILED, "Blockchain not ready"
//!                                          │
//!                                         yes
//!                                          ▼
//!                                       submit ─ok──► SENT(tx_hash)
//!                                          └─err──► FAILED
//! ```
//!
//! The per-id lock is held from the lookup to the terminal write, so a
//! concurrent duplicate waits and then sees the recorded outcome.
//!
//! Duplicate policy for an id that already has a record:
//!
//! | Stored status | Same hashes | Result |
//! |---------------|-------------|--------|
//! | `SENT`        | yes         | success with the stored `tx_hash`, no new transaction |
//! | `FAILED`      | yes         | `Conflict`: retry under a new processing id |
//! | `PENDING`     | yes         | `Conflict`: outcome unknown, awaiting reconciliation |
//! | any           | no          | `Conflict`, nothing changes |

use std::sync::Arc;

use anchor_chain::ChainSubmitter;
use anchor_core::{AnchorError, AnchorStatus, AuditRecord, EvidenceSubmission, TxHash};
use anchor_store::AuditLedger;

use crate::locks::ProcessingLocks;

/// A successful anchoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchored {
    /// The ledger transaction recording the evidence.
    pub tx_hash: TxHash,
    /// `true` if this request repeated an already-anchored id.
    pub duplicate: bool,
}

/// The anchoring request lifecycle.
#[derive(Debug, Clone)]
pub struct IntakeService {
    ledger: AuditLedger,
    submitter: Arc<ChainSubmitter>,
    locks: ProcessingLocks,
}

impl IntakeService {
    /// Wire the service to its store and submitter.
    pub fn new(ledger: AuditLedger, submitter: Arc<ChainSubmitter>) -> Self {
        Self {
            ledger,
            submitter,
            locks: ProcessingLocks::new(),
        }
    }

    /// Whether the signing identity is installed.
    pub fn is_ready(&self) -> bool {
        self.submitter.is_ready()
    }

    /// The audit store.
    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    /// Anchor one hash pair under `processing_id`.
    pub async fn handle(
        &self,
        processing_id: &str,
        source_hash: &str,
        result_hash: &str,
    ) -> Result<Anchored, AnchorError> {
        let submission = EvidenceSubmission::parse(processing_id, source_hash, result_hash)?;
        let id = &submission.processing_id;

        let _guard = self.locks.acquire(id).await;

        if let Some(existing) = self.ledger.find(id).await? {
            return resolve_duplicate(&existing, &submission);
        }

        if !self.ledger.create_pending(&submission).await? {
            // Another process sharing the database won the insert.
            let existing = self.ledger.get(id).await?;
            return resolve_duplicate(&existing, &submission);
        }
        tracing::info!(processing_id = %id, "anchoring attempt recorded");

        if !self.submitter.is_ready() {
            tracing::warn!(processing_id = %id, "signing identity locked; attempt failed");
            self.ledger.mark_failed(id).await?;
            return Err(AnchorError::not_ready());
        }

        match self.submitter.submit(&submission).await {
            Ok(tx_hash) => {
                if let Err(e) = self.ledger.mark_sent(id, &tx_hash).await {
                    // The transaction is out; only the local record is missing it.
                    tracing::error!(
                        processing_id = %id,
                        tx_hash = %tx_hash,
                        error = %e,
                        "ledger accepted transaction but audit record could not be updated"
                    );
                    return Err(e.into());
                }
                Ok(Anchored {
                    tx_hash,
                    duplicate: false,
                })
            }
            Err(submit_err) => {
                let err = AnchorError::from(submit_err);
                if let Err(store_err) = self.ledger.mark_failed(id).await {
                    tracing::error!(
                        processing_id = %id,
                        submission_error = %err,
                        error = %store_err,
                        "failed to record FAILED status"
                    );
                    return Err(store_err.into());
                }
                Err(err)
            }
        }
    }
}

fn resolve_duplicate(
    existing: &AuditRecord,
    submission: &EvidenceSubmission,
) -> Result<Anchored, AnchorError> {
    let id = &submission.processing_id;
    if !existing.matches(submission) {
        tracing::warn!(processing_id = %id, "processing id reused with different hashes");
        return Err(AnchorError::Conflict(format!(
            "processing id {id} is already recorded with different hashes"
        )));
    }

    match (existing.status, &existing.tx_hash) {
        (AnchorStatus::Sent, Some(tx_hash)) => {
            tracing::info!(processing_id = %id, tx_hash = %tx_hash, "duplicate of anchored id");
            Ok(Anchored {
                tx_hash: tx_hash.clone(),
                duplicate: true,
            })
        }
        (AnchorStatus::Sent, None) => Err(AnchorError::Store(format!(
            "audit record {id} is SENT without a transaction hash"
        ))),
        (AnchorStatus::Failed, _) => Err(AnchorError::Conflict(format!(
            "processing id {id} previously failed; submit under a new processing id"
        ))),
        (AnchorStatus::Pending, _) => Err(AnchorError::Conflict(format!(
            "processing id {id} has an attempt with unknown outcome awaiting reconciliation"
        ))),
    }
}
