//! Processing-id generation for the public relay.
//!
//! Relay callers do not choose ids. The relay derives one as
//!
//! ```text
//! 0x || sha256(utf8(source || result || timestamp || salt))
//! ```
//!
//! where `timestamp` is the latest block's timestamp (decimal seconds) and
//! `salt` a random integer in `1000..=9999`, so two identical requests in
//! the same block still get distinct ids. If the node cannot be asked,
//! the local clock stands in.

use anchor_chain::RpcClient;
use anchor_core::{sha256_raw, to_hex};
use rand_core::{OsRng, RngCore};

/// Where the id's timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// Latest block of the ledger.
    Block,
    /// This host's clock (ledger unreachable or not configured).
    Local,
}

impl TimestampSource {
    /// Wire label reported to relay callers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Block => "Blockchain Block Time",
            Self::Local => "Local Time",
        }
    }
}

/// Derive a relay processing id.
pub fn relay_processing_id(source: &str, result: &str, timestamp: u64, salt: u16) -> String {
    let preimage = format!("{source}{result}{timestamp}{salt}");
    format!("0x{}", to_hex(&sha256_raw(preimage.as_bytes())))
}

/// A random salt in `1000..=9999`.
pub fn random_salt() -> u16 {
    1000 + (OsRng.next_u32() % 9000) as u16
}

/// Timestamp for a relay id: the latest block's, else local time.
pub async fn relay_timestamp(rpc: Option<&RpcClient>) -> (u64, TimestampSource) {
    if let Some(rpc) = rpc {
        match rpc.latest_block().await {
            Ok(block) => {
                tracing::debug!(block = block.number, timestamp = block.timestamp, "relay block time");
                return (block.timestamp, TimestampSource::Block);
            }
            Err(e) => tracing::warn!(error = %e, "latest block unavailable; using local time"),
        }
    }
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    (now, TimestampSource::Local)
}
