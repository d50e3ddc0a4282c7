//! Error taxonomy for the ballot pipeline
//!
//! Each family maps to one class of caller mistake or system fault. Every
//! operation returns a typed [`Result`]; nothing here is meant to terminate the
//! hosting process.

use serde::{Deserialize, Serialize};

/// Malformed or missing caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    EmptyField { field: String },

    #[error("Malformed {field}: {reason}")]
    Malformed { field: String, reason: String },

    #[error("Voter ID already registered: {voter_id}")]
    DuplicateVoterId { voter_id: String },

    #[error("Contact address already registered to another voter")]
    DuplicateAddress,

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },
}

/// One-time passcode authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AuthError {
    #[error("Address is not registered to any voter")]
    UnregisteredAddress,

    #[error("No active code for this address; request a new one")]
    NoActiveCode,

    #[error("Code expired; request a new one")]
    Expired,

    #[error("Too many failed attempts; request a new code")]
    Locked,

    #[error("Incorrect code; {remaining_attempts} attempt(s) remaining")]
    Mismatch { remaining_attempts: u32 },
}

/// Vote casting precondition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StateError {
    #[error("Voter has already cast a ballot")]
    AlreadyVoted,

    #[error("Voter is not authenticated; complete OTP verification first")]
    NotAuthenticated,

    #[error("Unknown voter ID")]
    InvalidVoter,

    #[error("Unknown candidate")]
    InvalidCandidate,
}

/// Receipt ledger failures. Both variants withhold receipt contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum IntegrityError {
    #[error("Receipt not found in ledger")]
    ReceiptNotFound,

    #[error("Receipt failed integrity verification")]
    TamperDetected,
}

/// Key-value store failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StorageError {
    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    #[error("Storage delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {reason}")]
    InvalidKey { reason: String },

    #[error("Could not decode value at {key}: {reason}")]
    Codec { key: String, reason: String },
}

/// How a failure should be presented to the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Needs operator or voter attention
    Error,
    /// Recoverable by the caller (retry, re-authenticate)
    Warning,
    /// Nothing is wrong with the system; the request simply had no effect
    Info,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorSeverity::Error => "error",
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Info => "info",
        };
        f.write_str(label)
    }
}

/// Unified error type for all ballot operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BallotError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BallotError {
    /// Presentation category for the calling layer.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BallotError::Validation(_) => ErrorSeverity::Warning,
            BallotError::Auth(AuthError::UnregisteredAddress) => ErrorSeverity::Error,
            BallotError::Auth(AuthError::NoActiveCode) => ErrorSeverity::Info,
            BallotError::Auth(_) => ErrorSeverity::Warning,
            BallotError::State(StateError::InvalidVoter) => ErrorSeverity::Error,
            BallotError::State(_) => ErrorSeverity::Warning,
            BallotError::Integrity(IntegrityError::ReceiptNotFound) => ErrorSeverity::Info,
            BallotError::Integrity(IntegrityError::TamperDetected) => ErrorSeverity::Error,
            BallotError::Storage(_) => ErrorSeverity::Error,
        }
    }

    /// HTTP-style status a networked surface reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            BallotError::Validation(_) => 400,
            BallotError::Auth(AuthError::UnregisteredAddress) => 404,
            BallotError::Auth(AuthError::NoActiveCode) => 404,
            BallotError::Auth(AuthError::Expired) => 401,
            BallotError::Auth(AuthError::Mismatch { .. }) => 401,
            BallotError::Auth(AuthError::Locked) => 423,
            BallotError::State(StateError::NotAuthenticated) => 401,
            BallotError::State(StateError::AlreadyVoted) => 409,
            BallotError::State(StateError::InvalidVoter) => 404,
            BallotError::State(StateError::InvalidCandidate) => 404,
            BallotError::Integrity(IntegrityError::ReceiptNotFound) => 404,
            BallotError::Integrity(IntegrityError::TamperDetected) => 422,
            BallotError::Storage(_) => 500,
        }
    }

    /// Stable machine-readable name, used in audit details.
    pub fn kind(&self) -> &'static str {
        match self {
            BallotError::Validation(_) => "VALIDATION",
            BallotError::Auth(AuthError::UnregisteredAddress) => "UNREGISTERED_ADDRESS",
            BallotError::Auth(AuthError::NoActiveCode) => "NO_ACTIVE_CODE",
            BallotError::Auth(AuthError::Expired) => "EXPIRED",
            BallotError::Auth(AuthError::Locked) => "LOCKED",
            BallotError::Auth(AuthError::Mismatch { .. }) => "MISMATCH",
            BallotError::State(StateError::AlreadyVoted) => "ALREADY_VOTED",
            BallotError::State(StateError::NotAuthenticated) => "NOT_AUTHENTICATED",
            BallotError::State(StateError::InvalidVoter) => "INVALID_VOTER",
            BallotError::State(StateError::InvalidCandidate) => "INVALID_CANDIDATE",
            BallotError::Integrity(IntegrityError::ReceiptNotFound) => "RECEIPT_NOT_FOUND",
            BallotError::Integrity(IntegrityError::TamperDetected) => "TAMPER_DETECTED",
            BallotError::Storage(_) => "STORAGE",
        }
    }
}

/// Standard result type for ballot operations
pub type Result<T> = std::result::Result<T, BallotError>;
