//! # Ballot Journal - Ledger Layer
//!
//! **Purpose**: Append-only records of what the pipeline did.
//!
//! - [`AuditLog`]: authentication and voting events, best-effort, never fails
//!   the operation that produced them
//! - [`ReceiptLedger`]: one receipt per successful cast, keyed by a public
//!   identifier and sealed with an HMAC so tampering is detected on lookup
//!
//! Neither ledger exposes voter identifiers through its read APIs.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

/// Audit log
pub mod audit;
/// JSON and CSV rendering
pub mod export;
/// Receipt ledger
pub mod receipts;

pub use audit::{AuditEntry, AuditEvent, AuditEventType, AuditLog};
pub use export::ExportFormat;
pub use receipts::{Receipt, ReceiptLedger, ReceiptVerification};
