//! # Ballot Registry - Collaborator Layer
//!
//! **Purpose**: Registered voters and candidates, as consumed by the ballot
//! pipeline.
//!
//! The pipeline only needs lookups plus two one-way state transitions
//! (`has_voted` and the vote counter). Both are offered in two forms: a
//! `stage_*` method that adds the writes to a caller's [`WriteBatch`] so they
//! commit together with other ledger writes, and a standalone method that
//! commits immediately.
//!
//! [`WriteBatch`]: ballot_core::WriteBatch

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Candidate registry and vote counters
pub mod candidates;
/// Results summary
pub mod results;
/// Voter registry
pub mod voters;

pub use candidates::{CandidateTally, StoredCandidateTally};
pub use results::{CandidateResult, TallySummary};
pub use voters::{StoredVoterDirectory, VoterDirectory};
