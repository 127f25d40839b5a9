//! # Keystore Loading
//!
//! The signing account is described by an encrypted JSON keystore (Web3
//! Secret Storage, v3). This process only reads the account `address` and
//! checks that an encrypted `crypto` section is present; decryption happens
//! on the node when the account is unlocked with the [`Passphrase`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::abi::is_valid_eth_address;
use crate::error::KeystoreError;

/// Keystore passphrase. Zeroized on drop and redacted in `Debug`.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    /// Wrap a passphrase.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the secret for the unlock call.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// The parts of a keystore file this process relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystore {
    /// `0x`-prefixed, lowercase account address.
    pub address: String,
    /// Where the keystore was loaded from.
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct KeystoreFile {
    address: Option<String>,
    #[serde(alias = "Crypto")]
    crypto: Option<serde_json::Value>,
}

impl Keystore {
    /// Read and validate a keystore file.
    pub fn load(path: &Path) -> Result<Self, KeystoreError> {
        if !path.exists() {
            return Err(KeystoreError::Missing(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| KeystoreError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, KeystoreError> {
        let malformed = |reason: String| KeystoreError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let file: KeystoreFile =
            serde_json::from_str(raw).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

        match file.crypto {
            Some(serde_json::Value::Object(_)) => {}
            _ => return Err(malformed("missing encrypted 'crypto' section".to_string())),
        }

        let address = file
            .address
            .ok_or_else(|| malformed("missing 'address'".to_string()))?;
        let address = if address.starts_with("0x") {
            address
        } else {
            format!("0x{address}")
        }
        .to_ascii_lowercase();
        if !is_valid_eth_address(&address) {
            return Err(malformed(format!("invalid address {address}")));
        }

        Ok(Self {
            address,
            path: path.to_path_buf(),
        })
    }
}
