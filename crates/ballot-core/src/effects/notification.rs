//! Out-of-band delivery of one-time passcodes.
//!
//! Delivery is best-effort: a failure here never rolls back the code record
//! that was already persisted.

use crate::crypto::OtpCode;
use crate::types::ContactAddress;
use std::sync::Arc;

/// Notification delivery failure, reported separately from authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The transport could not be reached
    #[error("Delivery channel unavailable: {0}")]
    Unavailable(String),

    /// The transport refused the message
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Sends a passcode to a contact address (email, SMS, ...).
pub trait NotificationEffects: Send + Sync {
    /// Hand `code` to the delivery channel for `address`.
    fn deliver(&self, address: &ContactAddress, code: &OtpCode) -> Result<(), DeliveryError>;
}

impl<T: NotificationEffects + ?Sized> NotificationEffects for Arc<T> {
    fn deliver(&self, address: &ContactAddress, code: &OtpCode) -> Result<(), DeliveryError> {
        (**self).deliver(address, code)
    }
}
