//! Effect interfaces
//!
//! Every side effect the ballot pipeline performs goes through one of these
//! traits. Production handlers live in `ballot-effects`; deterministic handlers
//! for tests live in `ballot-testkit`. Components receive their handlers as
//! `Arc<dyn Trait>` at construction time.

pub mod notification;
pub mod random;
pub mod storage;
pub mod time;

pub use notification::{DeliveryError, NotificationEffects};
pub use random::{numeric_code, uniform_below, RandomEffects};
pub use storage::{validate_key, StorageEffects, StorageExt, WriteBatch, WriteOp};
pub use time::TimeEffects;
