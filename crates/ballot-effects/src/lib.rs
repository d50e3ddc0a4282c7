//! # Ballot Effects - Production Handlers
//!
//! Stateless or self-contained implementations of the effect traits defined in
//! `ballot-core`. These are the only places allowed to touch the system clock
//! and the operating system's random generator.
//!
//! Deterministic handlers for tests belong in `ballot-testkit`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Passcode delivery handlers
pub mod notification;
/// Operating system randomness
pub mod random;
/// Key-value store handlers
pub mod storage;
/// Wall clock
pub mod time;

pub use notification::{spawn_delivery_worker, ChannelNotifier, LoggingNotifier, OutboundCode};
pub use random::RealRandomHandler;
pub use storage::{FilesystemStorageHandler, MemoryStorageHandler};
pub use time::RealTimeHandler;
