//! Randomness effects and unbiased sampling helpers.

use std::sync::Arc;

/// Source of randomness for codes and nonces.
///
/// Production handlers must be backed by a cryptographically secure generator.
pub trait RandomEffects: Send + Sync {
    /// Fill a fresh buffer with `len` random bytes.
    fn random_bytes(&self, len: usize) -> Vec<u8>;

    /// 32 random bytes.
    fn random_bytes_32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.random_bytes(32));
        out
    }

    /// A uniformly random `u64`.
    fn random_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.random_bytes(8));
        u64::from_le_bytes(buf)
    }
}

impl<T: RandomEffects + ?Sized> RandomEffects for Arc<T> {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        (**self).random_bytes(len)
    }

    fn random_bytes_32(&self) -> [u8; 32] {
        (**self).random_bytes_32()
    }

    fn random_u64(&self) -> u64 {
        (**self).random_u64()
    }
}

/// Uniform value in `0..bound` using rejection sampling (no modulo bias).
///
/// Returns 0 when `bound` is 0.
pub fn uniform_below(rng: &dyn RandomEffects, bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    // 2^64 mod bound: draws below this value would over-weight small residues.
    let threshold = bound.wrapping_neg() % bound;
    loop {
        let draw = rng.random_u64();
        if draw >= threshold {
            return draw % bound;
        }
    }
}

/// Fixed-length decimal code with each digit drawn uniformly.
pub fn numeric_code(rng: &dyn RandomEffects, digits: usize) -> String {
    (0..digits)
        .map(|_| char::from(b'0' + uniform_below(rng, 10) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Replays a fixed script of u64 draws.
    struct Scripted(Mutex<Vec<u64>>);

    impl RandomEffects for Scripted {
        fn random_bytes(&self, len: usize) -> Vec<u8> {
            let mut out = Vec::with_capacity(len);
            while out.len() < len {
                let next = self.0.lock().pop().unwrap_or(0);
                out.extend_from_slice(&next.to_le_bytes());
            }
            out.truncate(len);
            out
        }
    }

    #[test]
    fn uniform_below_rejects_biased_draws() {
        // For bound 10, 2^64 mod 10 = 6: draws 0..6 must be rejected.
        let rng = Scripted(Mutex::new(vec![17, 3]));
        assert_eq!(uniform_below(&rng, 10), 7);
    }

    #[test]
    fn numeric_code_has_requested_length() {
        let rng = Scripted(Mutex::new(vec![19, 18, 17, 16, 15, 14]));
        let code = numeric_code(&rng, 6);
        assert_eq!(code, "456789");
    }

    #[test]
    fn zero_bound_is_zero() {
        let rng = Scripted(Mutex::new(vec![]));
        assert_eq!(uniform_below(&rng, 0), 0);
    }
}
