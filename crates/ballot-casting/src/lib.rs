//! # Ballot Casting - Orchestration Layer
//!
//! **Purpose**: Turn one authorized cast attempt into exactly one counted
//! vote, and expose the whole pipeline to an outer surface (CLI, RPC).
//!
//! # Architecture Constraints
//!
//! - YES Precondition checks and the four-way commit in one critical section
//! - YES Composition of the lower layers over shared effects
//! - NO direct storage keys of other layers (each layer stages its own writes)
//! - NO presentation (rendering of errors or results is the caller's job)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Exactly-once vote casting
pub mod caster;
/// Caller-facing operations
pub mod service;

pub use caster::BallotCaster;
pub use service::{AdminHandle, BallotEffects, BallotService};
