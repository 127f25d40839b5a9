#![deny(missing_docs)]

//! # anchor-core: Foundational Types for the Evidence Anchor
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal crate dependencies and performs no I/O.
//!
//! ## Design Principles
//!
//! 1. **Validated newtypes.** A [`ProcessingId`], [`EvidenceHash`] or
//!    [`TxHash`] can only be constructed through its validating constructor,
//!    including on deserialization. Malformed input is rejected before it
//!    reaches durable state.
//!
//! 2. **One status enum.** [`AnchorStatus`] is the only representation of the
//!    audit-record state machine (`PENDING → SENT | FAILED`). Both terminal
//!    states are absorbing.
//!
//! 3. **Structured errors.** [`AnchorError`] is the request-level taxonomy,
//!    decoupled from any transport status code.

pub mod digest;
pub mod error;
pub mod identity;
pub mod record;

pub use digest::{sha256_raw, to_hex, EvidenceHash, TxHash, WORD_LEN};
pub use error::{AnchorError, ValidationError};
pub use identity::ProcessingId;
pub use record::{AnchorStatus, AuditRecord, EvidenceSubmission};
