//! Striped per-key locks.
//!
//! A fixed array of mutexes indexed by key hash. Two keys may share a stripe
//! (the lock is then coarser than strictly needed) but one key always maps to
//! the same stripe, and memory stays bounded however many keys callers invent.
//!
//! Locks are process-local. Storage handlers that can be shared across
//! processes must refuse a second opener (see `FilesystemStorageHandler`).

use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Held stripe; the lock is released when this drops.
pub type KeyGuard<'a> = MutexGuard<'a, ()>;

/// Default number of stripes.
pub const DEFAULT_STRIPES: usize = 64;

/// Fixed set of mutexes selected by key.
#[derive(Debug)]
pub struct StripedLocks {
    stripes: Box<[Mutex<()>]>,
}

impl StripedLocks {
    /// Create `count` stripes (at least one).
    pub fn new(count: usize) -> Self {
        let stripes = (0..count.max(1)).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    /// Block until the stripe for `key` is held. Released when the guard drops.
    pub fn lock<K: Hash + ?Sized>(&self, key: &K) -> KeyGuard<'_> {
        self.stripes[self.stripe_index(key)].lock()
    }

    /// Stripe that `key` maps to.
    pub fn stripe_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn same_key_maps_to_same_stripe() {
        let locks = StripedLocks::new(8);
        assert_eq!(locks.stripe_index("a@x.com"), locks.stripe_index("a@x.com"));
        assert!(locks.stripe_index("b@x.com") < 8);
    }

    #[test]
    fn guard_serializes_read_modify_write() {
        let locks = Arc::new(StripedLocks::new(4));
        let counter = Arc::new(Mutex::new(0u32));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _guard = locks.lock("key");
                        let current = *counter.lock();
                        *counter.lock() = current + 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 800);
    }

    #[test]
    fn zero_stripes_is_clamped() {
        let locks = StripedLocks::new(0);
        let _guard = locks.lock("anything");
    }
}
