//! Ballot Testing Infrastructure
//!
//! Deterministic stand-ins for every effect trait, so tests control the clock,
//! replay randomness from a seed and inspect what would have been delivered.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use ballot_testkit::TestEffects;
//!
//! let effects = TestEffects::deterministic(42, 1_000);
//! effects.clock.advance_secs(301);
//! ```

pub mod notification;
pub mod random;
pub mod storage;
pub mod strategies;
pub mod time;

pub use notification::{FailingNotifier, RecordingNotifier};
pub use random::SeededRandom;
pub use storage::FailingStorage;
pub use time::ControllableClock;

use ballot_effects::MemoryStorageHandler;
use std::sync::Arc;

/// One deterministic handler per effect, shared through `Arc`s so a test can
/// keep a handle while the component under test holds another.
#[derive(Debug, Clone)]
pub struct TestEffects {
    /// Frozen clock
    pub clock: Arc<ControllableClock>,
    /// Seeded randomness
    pub random: Arc<SeededRandom>,
    /// In-memory store with injectable faults
    pub storage: Arc<FailingStorage<MemoryStorageHandler>>,
    /// Captures delivered codes
    pub notifier: Arc<RecordingNotifier>,
}

impl TestEffects {
    /// Seeded randomness, a clock frozen at `start_ms` and an empty store.
    pub fn deterministic(seed: u64, start_ms: u64) -> Self {
        Self {
            clock: Arc::new(ControllableClock::new(start_ms)),
            random: Arc::new(SeededRandom::new(seed)),
            storage: Arc::new(FailingStorage::new(MemoryStorageHandler::new())),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }
}
