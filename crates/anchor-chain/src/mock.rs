//! # Mock Signing Identity
//!
//! In-memory [`SigningIdentity`] for tests, compiled only under `cfg(test)`
//! or the `test-util` feature. It keeps
//! its own account nonce and rejects out-of-order nonces the way a node
//! does, so callers can observe nonce handling without a ledger.
//!
//! Transaction hashes are deterministic: `sha256(address || nonce)`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anchor_core::{sha256_raw, to_hex, TxHash};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ChainError;
use crate::identity::{SigningIdentity, TransactionRequest};

const DEFAULT_ADDRESS: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";

#[derive(Debug, Default)]
struct MockState {
    chain_nonce: u64,
    delay: Duration,
    sent: Vec<TransactionRequest>,
    reject: Option<String>,
    nonce_queries: usize,
}

/// Scriptable in-memory signing identity.
#[derive(Debug)]
pub struct MockSigningIdentity {
    address: String,
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockSigningIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSigningIdentity {
    /// A mock that accepts every well-ordered transaction immediately.
    pub fn new() -> Self {
        Self::with_address(DEFAULT_ADDRESS)
    }

    /// A mock bound to a specific account address.
    pub fn with_address(address: &str) -> Self {
        Self {
            address: address.to_ascii_lowercase(),
            state: Mutex::new(MockState::default()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every broadcast take `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    /// Change the broadcast delay for subsequent transactions.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    /// Start the account at a given on-chain nonce.
    pub fn with_chain_nonce(self, nonce: u64) -> Self {
        self.state.lock().chain_nonce = nonce;
        self
    }

    /// Reject subsequent broadcasts with `message` until [`Self::accept`].
    pub fn reject_with(&self, message: impl Into<String>) {
        self.state.lock().reject = Some(message.into());
    }

    /// Accept subsequent broadcasts again.
    pub fn accept(&self) {
        self.state.lock().reject = None;
    }

    /// Move the on-chain nonce, as if another sender used the account.
    pub fn bump_chain_nonce(&self, by: u64) {
        self.state.lock().chain_nonce += by;
    }

    /// Transactions accepted so far, in acceptance order.
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().sent.clone()
    }

    /// How many times the pending nonce was queried.
    pub fn nonce_queries(&self) -> usize {
        self.state.lock().nonce_queries
    }

    /// The largest number of broadcasts observed in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The hash this mock returns for a transaction with `nonce`.
    pub fn tx_hash_for(&self, nonce: u64) -> TxHash {
        let mut preimage = self.address.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        TxHash::new(format!("0x{}", to_hex(&sha256_raw(&preimage))))
            .unwrap_or_else(|_| unreachable!("sha256 output is 32 bytes"))
    }
}

#[async_trait]
impl SigningIdentity for MockSigningIdentity {
    fn address(&self) -> &str {
        &self.address
    }

    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        let mut state = self.state.lock();
        state.nonce_queries += 1;
        Ok(state.chain_nonce)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ChainError> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        let delay = self.state.lock().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut state = self.state.lock();
            if let Some(message) = state.reject.clone() {
                Err(rpc_error(-32000, message))
            } else if tx.nonce < state.chain_nonce {
                Err(rpc_error(-32000, "nonce too low".to_string()))
            } else if tx.nonce > state.chain_nonce {
                Err(rpc_error(-32000, "nonce too high".to_string()))
            } else {
                state.chain_nonce += 1;
                state.sent.push(tx.clone());
                Ok(())
            }
        };

        outcome.map(|()| self.tx_hash_for(tx.nonce))
    }
}

/// Counts a broadcast as in progress until dropped, including when the
/// caller abandons it mid-delay.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn rpc_error(code: i64, message: String) -> ChainError {
    ChainError::Rpc {
        method: "eth_sendTransaction".to_string(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64) -> TransactionRequest {
        TransactionRequest {
            from: DEFAULT_ADDRESS.to_string(),
            to: "0x0000000000000000000000000000000000000001".to_string(),
            data: "0x".to_string(),
            nonce,
        }
    }

    #[tokio::test]
    async fn accepts_in_order_nonces() {
        let mock = MockSigningIdentity::new();
        let h0 = mock.send_transaction(&tx(0)).await.unwrap();
        let h1 = mock.send_transaction(&tx(1)).await.unwrap();
        assert_ne!(h0, h1);
        assert_eq!(h0, mock.tx_hash_for(0));
        assert_eq!(mock.sent().len(), 2);
        assert_eq!(mock.pending_nonce().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejects_reused_and_skipped_nonces() {
        let mock = MockSigningIdentity::new().with_chain_nonce(5);
        let low = mock.send_transaction(&tx(4)).await.unwrap_err();
        assert!(low.to_string().contains("nonce too low"));
        let high = mock.send_transaction(&tx(7)).await.unwrap_err();
        assert!(high.to_string().contains("nonce too high"));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn scripted_rejection() {
        let mock = MockSigningIdentity::new();
        mock.reject_with("execution reverted");
        assert!(mock.send_transaction(&tx(0)).await.is_err());
        mock.accept();
        assert!(mock.send_transaction(&tx(0)).await.is_ok());
    }
}
