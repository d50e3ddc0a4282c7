//! Random effect handler backed by the operating system CSPRNG.

use ballot_core::effects::RandomEffects;
use rand::rngs::OsRng;
use rand::RngCore;

/// Real random handler using operating system randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct RealRandomHandler;

impl RealRandomHandler {
    /// Create a new real random handler
    pub fn new() -> Self {
        Self
    }
}

impl RandomEffects for RealRandomHandler {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    fn random_u64(&self) -> u64 {
        OsRng.next_u64()
    }
}
