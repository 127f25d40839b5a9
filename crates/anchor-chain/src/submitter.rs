//! # Chain Submitter
//!
//! Issues the `anchorEvidence` call for one submission. Issuance is
//! serialized: at most one sign-and-broadcast is in progress per process,
//! and the account's next nonce is tracked here.
//!
//! The nonce is seeded from the node (`pending` count) on first use and
//! advanced only when the node accepts a transaction. The cached value is
//! taken out of the cache for the duration of an attempt, so a failure, a
//! timeout, or a dropped `submit` future all leave it empty and the next
//! submission re-reads it from the node.

use std::sync::Arc;
use std::time::Duration;

use anchor_core::{EvidenceSubmission, TxHash};
use tokio::sync::Mutex;

use crate::abi;
use crate::error::{ChainError, SubmitError};
use crate::identity::{SignerSlot, SigningIdentity, TransactionRequest};

/// Serializing ledger submitter bound to one contract.
#[derive(Debug)]
pub struct ChainSubmitter {
    signer: SignerSlot,
    contract: String,
    timeout: Duration,
    next_nonce: Mutex<Option<u64>>,
}

impl ChainSubmitter {
    /// Create a submitter for `contract`, bounding each attempt by `timeout`.
    pub fn new(signer: SignerSlot, contract: impl Into<String>, timeout: Duration) -> Self {
        Self {
            signer,
            contract: contract.into().to_ascii_lowercase(),
            timeout,
            next_nonce: Mutex::new(None),
        }
    }

    /// The readiness cell this submitter draws its identity from.
    pub fn signer(&self) -> &SignerSlot {
        &self.signer
    }

    /// The contract address calls are sent to.
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Whether a signing identity is installed.
    pub fn is_ready(&self) -> bool {
        self.signer.is_ready()
    }

    /// Sign and broadcast `anchorEvidence` for `submission`. Exactly one attempt.
    pub async fn submit(&self, submission: &EvidenceSubmission) -> Result<TxHash, SubmitError> {
        let identity = self.signer.get().ok_or(SubmitError::NotReady)?;
        let data = abi::encode_anchor_evidence(submission);

        let mut next = self.next_nonce.lock().await;
        let cached = next.take();
        let attempt = self.attempt(identity.as_ref(), data, cached);

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok((nonce, hash))) => {
                *next = Some(nonce + 1);
                tracing::info!(
                    processing_id = %submission.processing_id,
                    nonce,
                    tx_hash = %hash,
                    "anchorEvidence accepted"
                );
                Ok(hash)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    processing_id = %submission.processing_id,
                    error = %e,
                    "anchorEvidence rejected"
                );
                Err(SubmitError::Rejected(e))
            }
            Err(_) => {
                tracing::warn!(
                    processing_id = %submission.processing_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "anchorEvidence timed out"
                );
                Err(SubmitError::TimedOut(self.timeout))
            }
        }
    }

    async fn attempt(
        &self,
        identity: &dyn SigningIdentity,
        data: String,
        cached: Option<u64>,
    ) -> Result<(u64, TxHash), ChainError> {
        let nonce = match cached {
            Some(n) => n,
            None => identity.pending_nonce().await?,
        };
        let tx = TransactionRequest {
            from: identity.address().to_string(),
            to: self.contract.clone(),
            data,
            nonce,
        };
        let hash = identity.send_transaction(&tx).await?;
        Ok((nonce, hash))
    }
}

/// Convenience for wiring a submitter around an already-ready identity.
pub fn ready_submitter(
    identity: Arc<dyn SigningIdentity>,
    contract: impl Into<String>,
    timeout: Duration,
) -> ChainSubmitter {
    ChainSubmitter::new(SignerSlot::ready(identity), contract, timeout)
}
