//! # Signing Identity
//!
//! [`SigningIdentity`] is the capability to issue transactions from one
//! ledger account. The production implementation, [`NodeSigningIdentity`],
//! unlocks the keystore account on the node and relies on the node to sign.
//!
//! Initialization can take a while (the node derives the key from the
//! keystore's KDF), so the service starts without an identity and installs
//! one into a [`SignerSlot`] when unlock completes. Until then every
//! submission is refused as not ready.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use anchor_core::TxHash;
use async_trait::async_trait;

use crate::error::{ChainError, IdentityError};
use crate::keystore::{Keystore, Passphrase};
use crate::rpc::RpcClient;

/// A contract call to be signed and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sending account.
    pub from: String,
    /// Contract address.
    pub to: String,
    /// `0x`-prefixed calldata.
    pub data: String,
    /// Account nonce to use.
    pub nonce: u64,
}

/// The signing capability bound to one ledger account.
#[async_trait]
pub trait SigningIdentity: Send + Sync + std::fmt::Debug {
    /// The account address (`0x`-prefixed, lowercase).
    fn address(&self) -> &str;

    /// The next nonce the ledger expects, including pool transactions.
    async fn pending_nonce(&self) -> Result<u64, ChainError>;

    /// Sign and broadcast. Returns once the ledger accepts the transaction.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ChainError>;
}

/// Signing delegated to the RPC node through an unlocked keystore account.
#[derive(Debug)]
pub struct NodeSigningIdentity {
    rpc: Arc<RpcClient>,
    address: String,
}

impl NodeSigningIdentity {
    /// Load the keystore and unlock its account on the node.
    ///
    /// `unlock_secs == 0` keeps the account unlocked until the node restarts.
    pub async fn unlock(
        rpc: Arc<RpcClient>,
        keystore_path: &Path,
        passphrase: &Passphrase,
        unlock_secs: u64,
    ) -> Result<Self, IdentityError> {
        let keystore = Keystore::load(keystore_path)?;
        tracing::info!(
            address = %keystore.address,
            keystore = %keystore.path.display(),
            "unlocking signing account"
        );

        let unlocked = rpc
            .unlock_account(&keystore.address, passphrase.expose(), unlock_secs)
            .await
            .map_err(|source| IdentityError::Unlock {
                address: keystore.address.clone(),
                source,
            })?;
        if !unlocked {
            return Err(IdentityError::Refused {
                address: keystore.address,
            });
        }

        tracing::info!(address = %keystore.address, "signing account unlocked");
        Ok(Self {
            rpc,
            address: keystore.address,
        })
    }
}

#[async_trait]
impl SigningIdentity for NodeSigningIdentity {
    fn address(&self) -> &str {
        &self.address
    }

    async fn pending_nonce(&self) -> Result<u64, ChainError> {
        self.rpc.transaction_count(&self.address).await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ChainError> {
        let raw = self
            .rpc
            .send_transaction(&tx.from, &tx.to, &tx.data, tx.nonce)
            .await?;
        TxHash::new(raw).map_err(|e| ChainError::InvalidResponse {
            method: "eth_sendTransaction".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Write-once holder for the signing identity.
///
/// Clones share the same cell. Empty means "not ready".
#[derive(Debug, Clone, Default)]
pub struct SignerSlot(Arc<OnceLock<Arc<dyn SigningIdentity>>>);

impl SignerSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that is ready from the start.
    pub fn ready(identity: Arc<dyn SigningIdentity>) -> Self {
        let slot = Self::new();
        slot.install(identity);
        slot
    }

    /// Install the identity. Returns `false` if one was already installed.
    pub fn install(&self, identity: Arc<dyn SigningIdentity>) -> bool {
        self.0.set(identity).is_ok()
    }

    /// The installed identity, if any.
    pub fn get(&self) -> Option<Arc<dyn SigningIdentity>> {
        self.0.get().cloned()
    }

    /// Whether an identity has been installed.
    pub fn is_ready(&self) -> bool {
        self.0.get().is_some()
    }
}
