//! Strongly typed identifiers and registry entities.
//!
//! Every identifier that arrives from a caller passes through a `parse`
//! constructor so that normalization (trimming, case folding) happens in one
//! place and storage keys derived from it are stable.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest contact address accepted (RFC 5321 path limit).
pub const MAX_ADDRESS_LEN: usize = 254;

/// Longest voter identifier accepted.
pub const MAX_VOTER_ID_LEN: usize = 128;

/// Width of a rendered receipt identifier in hex characters.
pub const RECEIPT_ID_HEX_LEN: usize = 16;

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from Unix milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Return the raw Unix milliseconds.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Timestamp `secs` seconds later, saturating at the far future.
    pub const fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs.saturating_mul(1000)))
    }

    /// Milliseconds from `self` until `later` (zero if `later` is not later).
    pub const fn millis_until(self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self::from_millis(value)
    }
}

/// Contact address (email or phone) a voter proves control of with an OTP.
///
/// Addresses are trimmed and ASCII-lowercased, so `" A@X.com"` and `"a@x.com"`
/// name the same voter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactAddress(String);

impl ContactAddress {
    /// Normalize and validate a raw address.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "address".to_string(),
            });
        }
        if trimmed.len() > MAX_ADDRESS_LEN {
            return Err(ValidationError::Malformed {
                field: "address".to_string(),
                reason: format!("longer than {MAX_ADDRESS_LEN} bytes"),
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::Malformed {
                field: "address".to_string(),
                reason: "contains whitespace or control characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Borrow the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public voter identifier printed on the voter's registration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    /// Validate a raw voter identifier (surrounding whitespace is dropped).
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "voter_id".to_string(),
            });
        }
        if trimmed.len() > MAX_VOTER_ID_LEN {
            return Err(ValidationError::Malformed {
                field: "voter_id".to_string(),
                reason: format!("longer than {MAX_VOTER_ID_LEN} bytes"),
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::Malformed {
                field: "voter_id".to_string(),
                reason: "contains control characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate identifier assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(u64);

impl CandidateId {
    /// Create a candidate identifier.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the raw identifier.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CandidateId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

/// Public, identity-free receipt identifier (upper-case hex).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Normalize a receipt identifier typed by a caller.
    ///
    /// Lookup is case-insensitive: the identifier is trimmed and upper-cased.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "receipt_id".to_string(),
            });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::Malformed {
                field: "receipt_id".to_string(),
                reason: "contains whitespace or control characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Render the leading bytes of a digest as a fixed-width identifier.
    pub fn from_digest(digest: &[u8]) -> Self {
        let width = RECEIPT_ID_HEX_LEN / 2;
        let take = digest.len().min(width);
        Self(hex::encode_upper(&digest[..take]))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registered voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    /// Public voter identifier
    pub voter_id: VoterId,
    /// Display name
    pub name: String,
    /// Contact address used for OTP delivery
    pub address: ContactAddress,
    /// Set once, by a successful cast; never cleared
    pub has_voted: bool,
    /// Registration time
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
}

/// Registered candidate with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate identifier
    pub id: CandidateId,
    /// Display name
    pub name: String,
    /// Party affiliation
    pub party: String,
    /// Ballot symbol
    pub symbol: String,
    /// Votes received so far; only ever incremented by one
    pub votes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn addresses_are_trimmed_and_lowercased() {
        let address = ContactAddress::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(address.as_str(), "alice@example.com");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert_matches!(
            ContactAddress::parse("   "),
            Err(ValidationError::EmptyField { .. })
        );
        assert_matches!(
            ContactAddress::parse("a b@x.com"),
            Err(ValidationError::Malformed { .. })
        );
    }

    #[test]
    fn receipt_ids_are_case_insensitive() {
        let id = ReceiptId::parse(" 00ab12cd34ef5678 ").unwrap();
        assert_eq!(id.as_str(), "00AB12CD34EF5678");
    }

    #[test]
    fn receipt_id_from_digest_is_fixed_width() {
        let id = ReceiptId::from_digest(&[0xab; 32]);
        assert_eq!(id.as_str().len(), RECEIPT_ID_HEX_LEN);
        assert_eq!(id.as_str(), "ABABABABABABABAB");
    }

    #[test]
    fn timestamp_arithmetic_saturates() {
        let t = Timestamp::from_millis(1_000);
        assert_eq!(t.plus_secs(300).as_millis(), 301_000);
        assert_eq!(Timestamp::from_millis(u64::MAX).plus_secs(1).as_millis(), u64::MAX);
        assert_eq!(t.millis_until(Timestamp::from_millis(500)), 0);
    }

    proptest::proptest! {
        #[test]
        fn address_normalization_is_idempotent(raw in "[ ]{0,2}[A-Za-z0-9._]{1,20}@[A-Za-z]{1,10}\\.[A-Za-z]{2,3}[ ]{0,2}") {
            let once = ContactAddress::parse(&raw).unwrap();
            let twice = ContactAddress::parse(once.as_str()).unwrap();
            proptest::prop_assert_eq!(&once, &twice);
            proptest::prop_assert_eq!(once.as_str(), raw.trim().to_ascii_lowercase());
        }
    }
}
