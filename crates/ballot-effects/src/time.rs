//! Real time handler delegating to the system clock.

use ballot_core::effects::TimeEffects;
use ballot_core::Timestamp;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Real time handler for production use
///
/// Stateless; every call reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

impl TimeEffects for RealTimeHandler {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Timestamp {
        // SystemTime::now() is allowed in production handlers that implement effect traits.
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp::from_millis(elapsed.as_millis() as u64)
    }
}
