//! # Call Encoding
//!
//! Calldata for the ledger contract's single write entry point and the
//! small hex helpers the JSON-RPC layer needs.
//!
//! ## Contract Interface
//!
//! ```solidity
//! function anchorEvidence(bytes32 processingId, bytes32 sourceHash, bytes32 resultHash) external;
//! ```
//!
//! All three arguments are static `bytes32`, so the calldata is the 4-byte
//! selector followed by three 32-byte words, 100 bytes in total.

use anchor_core::{to_hex, EvidenceSubmission};

/// 4-byte function selector for `anchorEvidence(bytes32,bytes32,bytes32)`.
/// keccak256("anchorEvidence(bytes32,bytes32,bytes32)") = 0x562ba668...
pub const ANCHOR_EVIDENCE_SELECTOR: &str = "562ba668";

/// Encode the `anchorEvidence` calldata for a submission as `0x`-prefixed hex.
pub fn encode_anchor_evidence(submission: &EvidenceSubmission) -> String {
    format!(
        "0x{ANCHOR_EVIDENCE_SELECTOR}{}{}{}",
        to_hex(&submission.processing_id.word()),
        to_hex(submission.source_hash.word()),
        to_hex(submission.result_hash.word()),
    )
}

/// Check that a string is a `0x`-prefixed 20-byte hex address.
pub fn is_valid_eth_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Format an integer as a JSON-RPC quantity (`0x` hex, no leading zeros).
pub fn to_quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Parse a JSON-RPC quantity. Returns `None` on anything but `0x` + hex digits.
pub fn parse_quantity(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
