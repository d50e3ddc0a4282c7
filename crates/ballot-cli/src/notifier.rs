//! Terminal delivery for demo sessions.

use ballot_core::effects::{DeliveryError, NotificationEffects};
use ballot_core::{ContactAddress, OtpCode};

/// Prints the passcode for the operator to read out, instead of mailing it.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl NotificationEffects for ConsoleNotifier {
    fn deliver(&self, address: &ContactAddress, code: &OtpCode) -> Result<(), DeliveryError> {
        println!("(demo delivery) Passcode for {address}: {}", code.expose());
        Ok(())
    }
}
