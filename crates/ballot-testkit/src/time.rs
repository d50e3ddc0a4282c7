//! Controllable clock

use ballot_core::effects::TimeEffects;
use ballot_core::types::Timestamp;
use parking_lot::Mutex;

/// Clock that only moves when a test moves it.
#[derive(Debug)]
pub struct ControllableClock {
    current: Mutex<u64>,
}

impl ControllableClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            current: Mutex::new(start_ms),
        }
    }

    /// Advance by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance_millis(secs.saturating_mul(1_000));
    }

    /// Advance by milliseconds.
    pub fn advance_millis(&self, ms: u64) {
        let mut current = self.current.lock();
        *current = current.saturating_add(ms);
    }

    /// Set absolute time
    pub fn set_millis(&self, ms: u64) {
        *self.current.lock() = ms;
    }
}

impl TimeEffects for ControllableClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(*self.current.lock())
    }
}
