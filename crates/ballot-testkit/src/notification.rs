//! Notification test doubles

use ballot_core::crypto::OtpCode;
use ballot_core::effects::{DeliveryError, NotificationEffects};
use ballot_core::types::ContactAddress;
use parking_lot::Mutex;

/// Captures every delivered code so a test can "read its mail".
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(ContactAddress, String)>>,
}

impl RecordingNotifier {
    /// Create a notifier with no recorded deliveries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `address`.
    pub fn last_code_for(&self, address: &str) -> Option<String> {
        let address = ContactAddress::parse(address).ok()?;
        self.delivered
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| *to == address)
            .map(|(_, code)| code.clone())
    }

    /// Number of deliveries so far.
    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().len()
    }

    /// Every delivery in order.
    pub fn deliveries(&self) -> Vec<(ContactAddress, String)> {
        self.delivered.lock().clone()
    }
}

impl NotificationEffects for RecordingNotifier {
    fn deliver(&self, address: &ContactAddress, code: &OtpCode) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .push((address.clone(), code.expose().to_string()));
        Ok(())
    }
}

/// Rejects every delivery.
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl NotificationEffects for FailingNotifier {
    fn deliver(&self, _address: &ContactAddress, _code: &OtpCode) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable("test transport offline".to_string()))
    }
}
