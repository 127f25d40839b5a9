//! Ledger-side error types.

use std::path::PathBuf;
use std::time::Duration;

use anchor_core::AnchorError;

/// Errors from JSON-RPC calls to the ledger node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    /// The HTTP client could not be constructed.
    #[error("failed to build RPC client: {0}")]
    ClientBuild(String),

    /// The node could not be reached or the request timed out.
    #[error("{method}: transport error: {reason}")]
    Transport {
        /// JSON-RPC method.
        method: String,
        /// Underlying failure.
        reason: String,
    },

    /// The node answered with a non-2xx HTTP status.
    #[error("{method}: HTTP {status}")]
    Http {
        /// JSON-RPC method.
        method: String,
        /// HTTP status code.
        status: u16,
    },

    /// The node returned a JSON-RPC error object (revert, nonce, funds, ...).
    #[error("{method}: {message} (code {code})")]
    Rpc {
        /// JSON-RPC method.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("{method}: invalid response: {reason}")]
    InvalidResponse {
        /// JSON-RPC method.
        method: String,
        /// What was wrong.
        reason: String,
    },
}

/// Errors loading key material.
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    /// The keystore path does not exist.
    #[error("keystore file missing at: {}", .0.display())]
    Missing(PathBuf),

    /// The keystore could not be read.
    #[error("keystore {} unreadable: {source}", .path.display())]
    Unreadable {
        /// Keystore path.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },

    /// The keystore is not a usable encrypted JSON keystore.
    #[error("keystore {} malformed: {reason}", .path.display())]
    Malformed {
        /// Keystore path.
        path: PathBuf,
        /// What failed to validate.
        reason: String,
    },
}

/// Errors initializing the signing identity. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Key material is missing or corrupt.
    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    /// The node could not be asked to unlock the account.
    #[error("failed to unlock account {address}: {source}")]
    Unlock {
        /// Account address.
        address: String,
        /// RPC failure.
        source: ChainError,
    },

    /// The node refused the passphrase.
    #[error("node refused to unlock account {address}")]
    Refused {
        /// Account address.
        address: String,
    },
}

impl From<IdentityError> for AnchorError {
    fn from(err: IdentityError) -> Self {
        AnchorError::Configuration(err.to_string())
    }
}

/// Errors from a single ledger submission.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    /// No signing identity is installed yet.
    #[error("signing identity not ready")]
    NotReady,

    /// The node rejected the transaction or was unreachable.
    #[error(transparent)]
    Rejected(#[from] ChainError),

    /// The node did not accept the transaction within the bound.
    #[error("ledger submission timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<SubmitError> for AnchorError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::NotReady => AnchorError::not_ready(),
            other => AnchorError::Submission(other.to_string()),
        }
    }
}
