//! # Ballot Authentication
//!
//! Proves that a caller controls a registered contact address, then holds that
//! proof open for a single cast attempt.
//!
//! - [`OtpAuthenticator`]: issues numeric one-time passcodes with expiry and
//!   attempt lockout
//! - [`SessionGate`]: time-boxed, single-use authorization per address
//!
//! Expiry is evaluated lazily on access; nothing here runs in the background.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod otp;
pub mod session;

pub use otp::{AcceptedCode, OtpAuthenticator, OtpIssued, OtpRecord};
pub use session::{Session, SessionGate};
