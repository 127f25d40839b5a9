//! # anchor-chain: Ledger Submission for the Evidence Anchor
//!
//! Turns an accepted anchoring request into exactly one call of the ledger
//! contract's entry point:
//!
//! ```solidity
//! function anchorEvidence(bytes32 processingId, bytes32 sourceHash, bytes32 resultHash) external;
//! ```
//!
//! ## Architecture
//!
//! - [`SigningIdentity`] is the seam to the signing capability bound to one
//!   ledger account. [`NodeSigningIdentity`] delegates signing to the RPC
//!   node: the account is unlocked on the node with the keystore passphrase
//!   and transactions go out through `eth_sendTransaction`. No private key
//!   material is held in this process.
//! - [`SignerSlot`] is the write-once readiness cell. It is empty until the
//!   identity finishes initialization.
//! - [`ChainSubmitter`] serializes signing-and-broadcast behind one async
//!   mutex and owns the account's next nonce, so concurrent requests never
//!   race for the same nonce. Each call attempts exactly once, bounded by a
//!   timeout.
//!
//! The submitter returns once the node accepts the transaction for
//! broadcast. It does not wait for confirmation depth.

pub mod abi;
pub mod error;
pub mod identity;
pub mod keystore;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod rpc;
pub mod submitter;

pub use error::{ChainError, IdentityError, KeystoreError, SubmitError};
pub use identity::{NodeSigningIdentity, SignerSlot, SigningIdentity, TransactionRequest};
pub use keystore::{Keystore, Passphrase};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockSigningIdentity;
pub use rpc::{BlockInfo, RpcClient};
pub use submitter::{ready_submitter, ChainSubmitter};
