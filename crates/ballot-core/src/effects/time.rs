//! Wall-clock time effects.
//!
//! Expiry of codes and sessions is checked lazily against this clock at access
//! time, so a controllable handler is enough to test every expiry edge.

use crate::types::Timestamp;
use std::sync::Arc;

/// Wall-clock time for timestamps and expiration.
pub trait TimeEffects: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now(&self) -> Timestamp;
}

impl<T: TimeEffects + ?Sized> TimeEffects for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
