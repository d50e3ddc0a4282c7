//! Hashing, keyed integrity and secret wrappers
//!
//! All multi-part inputs are framed (little-endian length prefix per part, after
//! a domain label) so that `("ab", "c")` and `("a", "bc")` never collide.

use crate::errors::ValidationError;
use crate::effects::RandomEffects;
use hmac::digest::generic_array::GenericArray;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 block size; HMAC zero-pads shorter keys to this length.
const HMAC_BLOCK_LEN: usize = 64;

/// Length of a [`LedgerKey`] in bytes.
pub const LEDGER_KEY_LEN: usize = 32;

/// SHA-256 over a domain label and framed parts.
pub fn framed_sha256(domain: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(frame_len(domain.as_bytes()));
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update(frame_len(part));
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Constant-time equality; differing lengths compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn frame_len(part: &[u8]) -> [u8; 8] {
    (part.len() as u64).to_le_bytes()
}

/// Secret key for receipt integrity tags (HMAC-SHA256).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LedgerKey([u8; LEDGER_KEY_LEN]);

impl LedgerKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; LEDGER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh key from `rng`.
    pub fn generate(rng: &dyn RandomEffects) -> Self {
        Self(rng.random_bytes_32())
    }

    /// Parse a hex-encoded key (surrounding whitespace ignored).
    pub fn from_hex(encoded: &str) -> Result<Self, ValidationError> {
        let mut bytes = hex::decode(encoded.trim()).map_err(|e| ValidationError::Malformed {
            field: "ledger_key".to_string(),
            reason: e.to_string(),
        })?;
        if bytes.len() != LEDGER_KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(ValidationError::Malformed {
                field: "ledger_key".to_string(),
                reason: format!("expected {LEDGER_KEY_LEN} bytes, got {len}"),
            });
        }
        let mut key = [0u8; LEDGER_KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Hex encoding, for writing the key file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// HMAC-SHA256 over a domain label and framed parts.
    pub fn mac(&self, domain: &str, parts: &[&[u8]]) -> [u8; 32] {
        let mut block = [0u8; HMAC_BLOCK_LEN];
        block[..LEDGER_KEY_LEN].copy_from_slice(&self.0);
        let mut mac = <HmacSha256 as KeyInit>::new(GenericArray::from_slice(&block));
        block.zeroize();

        mac.update(&frame_len(domain.as_bytes()));
        mac.update(domain.as_bytes());
        for part in parts {
            mac.update(&frame_len(part));
            mac.update(part);
        }
        mac.finalize().into_bytes().into()
    }
}

impl fmt::Debug for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LedgerKey(<redacted>)")
    }
}

/// A one-time passcode. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Wrap a generated code.
    pub fn new(code: String) -> Self {
        Self(code)
    }

    /// The code's digits, for handing to a delivery channel.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against caller input.
    pub fn matches(&self, input: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), input.as_bytes())
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(<redacted>)")
    }
}
