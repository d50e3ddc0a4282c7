//! Passcode delivery handlers
//!
//! Delivery is fire-and-forget relative to authentication state: a handler
//! reports failure through [`DeliveryError`] and the caller decides how to
//! record it. Neither handler here ever writes the code to a log.

use ballot_core::crypto::OtpCode;
use ballot_core::effects::{DeliveryError, NotificationEffects};
use ballot_core::types::ContactAddress;
use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Records that a code was issued without transmitting it anywhere.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    /// Create a new logging notifier
    pub fn new() -> Self {
        Self
    }
}

impl NotificationEffects for LoggingNotifier {
    fn deliver(&self, address: &ContactAddress, _code: &OtpCode) -> Result<(), DeliveryError> {
        tracing::info!(address = %address, "Passcode ready for delivery");
        Ok(())
    }
}

/// A code queued for an out-of-process sender.
#[derive(Debug, Clone)]
pub struct OutboundCode {
    /// Destination
    pub address: ContactAddress,
    /// Passcode to transmit
    pub code: OtpCode,
}

/// Hands codes to a background delivery task over an unbounded channel.
///
/// `deliver` never waits on the transport; it only fails once the receiving
/// side has gone away.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<OutboundCode>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver a delivery task should drain.
    pub fn channel() -> (Self, UnboundedReceiver<OutboundCode>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Wrap an existing sender.
    pub fn from_sender(sender: UnboundedSender<OutboundCode>) -> Self {
        Self { sender }
    }
}

impl NotificationEffects for ChannelNotifier {
    fn deliver(&self, address: &ContactAddress, code: &OtpCode) -> Result<(), DeliveryError> {
        self.sender
            .send(OutboundCode {
                address: address.clone(),
                code: code.clone(),
            })
            .map_err(|_| DeliveryError::Unavailable("delivery channel closed".to_string()))
    }
}

/// Drain `receiver` on the current Tokio runtime, calling `send` for each code.
///
/// Transport failures are logged and the worker moves on to the next code. The
/// task ends when every [`ChannelNotifier`] sharing the channel is dropped.
pub fn spawn_delivery_worker<F, Fut>(
    mut receiver: UnboundedReceiver<OutboundCode>,
    send: F,
) -> JoinHandle<()>
where
    F: Fn(OutboundCode) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(outbound) = receiver.recv().await {
            let address = outbound.address.clone();
            if let Err(error) = send(outbound).await {
                tracing::warn!(address = %address, error = %error, "Passcode delivery failed");
            }
        }
        tracing::debug!("Delivery channel closed; worker exiting");
    })
}
