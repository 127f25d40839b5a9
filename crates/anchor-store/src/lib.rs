//! # anchor-store: Audit Ledger Store
//!
//! Durable, crash-safe table of anchoring attempts keyed by processing id.
//! This crate owns the audit-record state machine:
//!
//! ```text
//! (absent) --create_pending--> PENDING --mark_sent----> SENT    (terminal)
//!                                      \--mark_failed--> FAILED  (terminal)
//! ```
//!
//! ## Guarantees
//!
//! - `create_pending` is idempotent: a second call with the same id is a
//!   no-op reporting `created = false`.
//! - Transitions only apply to `PENDING` rows. A transition attempted on a
//!   terminal row fails with [`StoreError::AlreadyTerminal`] and changes
//!   nothing. Schema triggers reject the same mutation if it is attempted
//!   outside this crate.
//! - Rows are never deleted.
//!
//! Each operation is a single statement on a pooled connection, so each is
//! atomic with respect to concurrent callers. Sequences of operations are
//! not; callers that need decide-then-act atomicity per processing id must
//! serialize themselves.
//!
//! ## Storage
//!
//! SQLite in WAL journal mode with `synchronous = NORMAL`: concurrent readers,
//! one writer at a time, durable across process crashes.

pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::{AuditLedger, StoreConfig};
