//! # Ballot Core - Foundation Layer
//!
//! **Purpose**: Define the identifiers, error taxonomy and effect interfaces
//! shared by every crate of the ballot pipeline.
//!
//! # Architecture Constraints
//!
//! - YES Strongly typed identifiers and registry entities
//! - YES Effect traits (time, randomness, storage, notification)
//! - YES Pure cryptographic helpers (framed hashing, HMAC tags)
//! - YES Configuration types and validation
//! - NO effect handler implementations (those live in `ballot-effects`)
//! - NO authentication, casting or ledger logic

#![forbid(unsafe_code)]
#![allow(missing_docs)]

/// Layered configuration
pub mod config;

/// Hashing, HMAC and secret wrappers
pub mod crypto;

/// Effect interfaces
pub mod effects;

/// Error taxonomy
pub mod errors;

/// Striped per-key locks
pub mod sync;

/// Identifiers and entities
pub mod types;

pub use config::BallotConfig;
pub use crypto::{LedgerKey, OtpCode};
pub use effects::{
    DeliveryError, NotificationEffects, RandomEffects, StorageEffects, StorageExt, TimeEffects,
    WriteBatch, WriteOp,
};
pub use errors::{
    AuthError, BallotError, ErrorSeverity, IntegrityError, Result, StateError, StorageError,
    ValidationError,
};
pub use sync::{KeyGuard, StripedLocks};
pub use types::{Candidate, CandidateId, ContactAddress, ReceiptId, Timestamp, Voter, VoterId};
