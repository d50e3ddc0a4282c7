//! Receipt ledger
//!
//! A receipt proves a ballot was counted without saying who cast it. The
//! stored record keeps the voter id so the integrity tag binds it, but no read
//! path returns it.
//!
//! - `receipt_id`: first 8 bytes of SHA-256 over (candidate id, timestamp,
//!   16-byte nonce), upper-case hex
//! - `integrity_tag`: HMAC-SHA256 under the ledger key over every stored field,
//!   lower-case hex, compared in constant time on verification

use crate::export::{csv_record, rfc3339, ExportFormat};
use ballot_core::crypto::{constant_time_eq, framed_sha256};
use ballot_core::effects::{RandomEffects, StorageEffects, StorageExt, TimeEffects, WriteBatch};
use ballot_core::{
    CandidateId, IntegrityError, LedgerKey, ReceiptId, Result, StorageError, Timestamp, VoterId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const RECEIPT_PREFIX: &str = "receipts/";
const RECEIPT_ID_DOMAIN: &str = "ballot/receipt-id/v1";
const INTEGRITY_TAG_DOMAIN: &str = "ballot/receipt-tag/v1";
const NONCE_LEN: usize = 16;
const MAX_ID_ATTEMPTS: usize = 8;
const CSV_HEADER: [&str; 4] = ["receipt_id", "candidate", "timestamp", "integrity_tag"];

fn receipt_key(receipt_id: &ReceiptId) -> String {
    format!("{RECEIPT_PREFIX}{}", receipt_id.as_str())
}

/// Issued receipt, as handed to the voter or an auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Public identifier, 16 uppercase hex characters
    pub receipt_id: ReceiptId,
    /// Candidate the vote counted for
    pub candidate_id: CandidateId,
    /// Candidate name at the time of casting
    pub candidate_name: String,
    /// When the vote was cast
    pub timestamp: Timestamp,
    /// Hex HMAC over the stored record
    pub integrity_tag: String,
}

/// Everything verification discloses: which candidate, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptVerification {
    /// Candidate the vote counted for
    pub candidate_name: String,
    /// When the vote was cast
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredReceipt {
    receipt_id: ReceiptId,
    voter_id: VoterId,
    candidate_id: CandidateId,
    candidate_name: String,
    timestamp: Timestamp,
    integrity_tag: String,
}

impl StoredReceipt {
    fn public(&self) -> Receipt {
        Receipt {
            receipt_id: self.receipt_id.clone(),
            candidate_id: self.candidate_id,
            candidate_name: self.candidate_name.clone(),
            timestamp: self.timestamp,
            integrity_tag: self.integrity_tag.clone(),
        }
    }
}

/// Append-only ledger of cast receipts.
pub struct ReceiptLedger {
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
    random: Arc<dyn RandomEffects>,
    key: LedgerKey,
}

impl ReceiptLedger {
    /// Create a ledger that tags receipts with `key`.
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn TimeEffects>,
        random: Arc<dyn RandomEffects>,
        key: LedgerKey,
    ) -> Self {
        Self {
            storage,
            time,
            random,
            key,
        }
    }

    /// Issue and persist a receipt immediately.
    pub fn issue(
        &self,
        voter_id: &VoterId,
        candidate_id: CandidateId,
        candidate_name: &str,
    ) -> Result<Receipt> {
        let mut batch = WriteBatch::new();
        let receipt = self.stage_issue(voter_id, candidate_id, candidate_name, &mut batch)?;
        self.storage.apply_batch(batch)?;
        Ok(receipt)
    }

    /// Build a receipt and add its write to `batch`.
    ///
    /// The receipt exists only once the batch is applied.
    pub fn stage_issue(
        &self,
        voter_id: &VoterId,
        candidate_id: CandidateId,
        candidate_name: &str,
        batch: &mut WriteBatch,
    ) -> Result<Receipt> {
        let timestamp = self.time.now();
        let receipt_id = self.fresh_receipt_id(candidate_id, timestamp)?;
        let integrity_tag = self.integrity_tag(
            &receipt_id,
            timestamp,
            candidate_id,
            candidate_name,
            voter_id,
        );
        let stored = StoredReceipt {
            receipt_id,
            voter_id: voter_id.clone(),
            candidate_id,
            candidate_name: candidate_name.to_string(),
            timestamp,
            integrity_tag,
        };
        batch.put_json(receipt_key(&stored.receipt_id), &stored)?;
        Ok(stored.public())
    }

    fn fresh_receipt_id(&self, candidate_id: CandidateId, timestamp: Timestamp) -> Result<ReceiptId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let nonce = self.random.random_bytes(NONCE_LEN);
            let digest = framed_sha256(
                RECEIPT_ID_DOMAIN,
                &[
                    &candidate_id.value().to_le_bytes()[..],
                    &timestamp.as_millis().to_le_bytes()[..],
                    nonce.as_slice(),
                ],
            );
            let receipt_id = ReceiptId::from_digest(&digest);
            if self.storage.retrieve(&receipt_key(&receipt_id))?.is_none() {
                return Ok(receipt_id);
            }
            tracing::warn!(receipt_id = %receipt_id, "Receipt id collision; drawing a new nonce");
        }
        Err(StorageError::WriteFailed("could not allocate a unique receipt id".to_string()).into())
    }

    fn integrity_tag(
        &self,
        receipt_id: &ReceiptId,
        timestamp: Timestamp,
        candidate_id: CandidateId,
        candidate_name: &str,
        voter_id: &VoterId,
    ) -> String {
        hex::encode(self.key.mac(
            INTEGRITY_TAG_DOMAIN,
            &[
                receipt_id.as_str().as_bytes(),
                &timestamp.as_millis().to_le_bytes(),
                &candidate_id.value().to_le_bytes(),
                candidate_name.as_bytes(),
                voter_id.as_str().as_bytes(),
            ],
        ))
    }

    fn is_intact(&self, stored: &StoredReceipt, looked_up: &ReceiptId) -> bool {
        let expected = self.integrity_tag(
            &stored.receipt_id,
            stored.timestamp,
            stored.candidate_id,
            &stored.candidate_name,
            &stored.voter_id,
        );
        stored.receipt_id == *looked_up
            && constant_time_eq(expected.as_bytes(), stored.integrity_tag.as_bytes())
    }

    /// Confirm a receipt without revealing who cast it.
    ///
    /// The identifier is trimmed and upper-cased first. Anything that does not
    /// recompute to the stored tag, including a record that no longer decodes,
    /// is reported as tampered and nothing else is disclosed.
    pub fn verify(&self, receipt_id: &str) -> Result<ReceiptVerification> {
        let receipt_id = ReceiptId::parse(receipt_id)?;
        let Some(bytes) = self.storage.retrieve(&receipt_key(&receipt_id))? else {
            return Err(IntegrityError::ReceiptNotFound.into());
        };

        let stored = match serde_json::from_slice::<StoredReceipt>(&bytes) {
            Ok(stored) if self.is_intact(&stored, &receipt_id) => stored,
            _ => {
                tracing::warn!(receipt_id = %receipt_id, "Receipt failed integrity check");
                return Err(IntegrityError::TamperDetected.into());
            }
        };

        Ok(ReceiptVerification {
            candidate_name: stored.candidate_name,
            timestamp: stored.timestamp,
        })
    }

    /// All receipts with voter ids removed, oldest first.
    ///
    /// Records that no longer decode are skipped with a warning; `verify`
    /// reports them individually.
    pub fn list_for_audit(&self) -> Result<Vec<Receipt>> {
        let mut receipts = Vec::new();
        for key in self.storage.list_keys(RECEIPT_PREFIX)? {
            match self.storage.get_json::<StoredReceipt>(&key) {
                Ok(Some(stored)) => receipts.push(stored.public()),
                Ok(None) => {}
                Err(StorageError::Codec { key, .. }) => {
                    tracing::warn!(key = %key, "Skipping undecodable receipt");
                }
                Err(other) => return Err(other.into()),
            }
        }
        receipts.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.receipt_id.cmp(&b.receipt_id))
        });
        Ok(receipts)
    }

    /// Render the redacted ledger, oldest first.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let receipts = self.list_for_audit()?;
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&receipts).map_err(|e| {
                StorageError::Codec {
                    key: RECEIPT_PREFIX.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            ExportFormat::Csv => {
                let mut out = csv_record(CSV_HEADER);
                for receipt in &receipts {
                    out.push_str(&csv_record([
                        receipt.receipt_id.as_str(),
                        receipt.candidate_name.as_str(),
                        rfc3339(receipt.timestamp).as_str(),
                        receipt.integrity_tag.as_str(),
                    ]));
                }
                Ok(out)
            }
        }
    }

    /// Number of receipts in the ledger.
    pub fn count(&self) -> Result<usize> {
        Ok(self.storage.list_keys(RECEIPT_PREFIX)?.len())
    }
}

impl std::fmt::Debug for ReceiptLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ballot_core::BallotError;
    use ballot_testkit::TestEffects;

    fn ledger(effects: &TestEffects) -> ReceiptLedger {
        ReceiptLedger::new(
            effects.storage.clone(),
            effects.clock.clone(),
            effects.random.clone(),
            LedgerKey::from_bytes([9u8; 32]),
        )
    }

    fn voter() -> VoterId {
        VoterId::parse("V1").unwrap()
    }

    #[test]
    fn issued_receipt_verifies_with_name_and_time() {
        let effects = TestEffects::deterministic(11, 1_000);
        let ledger = ledger(&effects);
        let receipt = ledger.issue(&voter(), CandidateId::new(5), "Alice").unwrap();

        assert_eq!(receipt.receipt_id.as_str().len(), 16);
        assert_eq!(receipt.timestamp, Timestamp::from_millis(1_000));
        let verified = ledger.verify(receipt.receipt_id.as_str()).unwrap();
        assert_eq!(
            verified,
            ReceiptVerification {
                candidate_name: "Alice".to_string(),
                timestamp: Timestamp::from_millis(1_000),
            }
        );
    }

    #[test]
    fn lookup_is_case_insensitive_and_unknown_ids_are_not_found() {
        let effects = TestEffects::deterministic(11, 1_000);
        let ledger = ledger(&effects);
        let receipt = ledger.issue(&voter(), CandidateId::new(5), "Alice").unwrap();

        let lower = format!("  {} ", receipt.receipt_id.as_str().to_ascii_lowercase());
        assert!(ledger.verify(&lower).is_ok());
        assert_matches!(
            ledger.verify("UNKNOWN"),
            Err(BallotError::Integrity(IntegrityError::ReceiptNotFound))
        );
    }

    #[test]
    fn edited_candidate_name_is_tamper() {
        let effects = TestEffects::deterministic(11, 1_000);
        let ledger = ledger(&effects);
        let receipt = ledger.issue(&voter(), CandidateId::new(5), "Alice").unwrap();

        let key = receipt_key(&receipt.receipt_id);
        let raw = effects.storage.retrieve(&key).unwrap().unwrap();
        let forged = String::from_utf8(raw).unwrap().replace("Alice", "Mallory");
        effects.storage.store(&key, forged.into_bytes()).unwrap();

        assert_matches!(
            ledger.verify(receipt.receipt_id.as_str()),
            Err(BallotError::Integrity(IntegrityError::TamperDetected))
        );
    }

    #[test]
    fn garbage_record_is_tamper() {
        let effects = TestEffects::deterministic(11, 1_000);
        let ledger = ledger(&effects);
        let receipt = ledger.issue(&voter(), CandidateId::new(5), "Alice").unwrap();
        effects
            .storage
            .store(&receipt_key(&receipt.receipt_id), b"{not json".to_vec())
            .unwrap();

        assert_matches!(
            ledger.verify(receipt.receipt_id.as_str()),
            Err(BallotError::Integrity(IntegrityError::TamperDetected))
        );
        assert!(ledger.list_for_audit().unwrap().is_empty());
    }

    #[test]
    fn a_different_key_cannot_vouch_for_receipts() {
        let effects = TestEffects::deterministic(11, 1_000);
        let receipt = ledger(&effects)
            .issue(&voter(), CandidateId::new(5), "Alice")
            .unwrap();
        let other = ReceiptLedger::new(
            effects.storage.clone(),
            effects.clock.clone(),
            effects.random.clone(),
            LedgerKey::from_bytes([1u8; 32]),
        );
        assert_matches!(
            other.verify(receipt.receipt_id.as_str()),
            Err(BallotError::Integrity(IntegrityError::TamperDetected))
        );
    }

    #[test]
    fn audit_listing_and_exports_omit_voter_ids() {
        let effects = TestEffects::deterministic(11, 2_000);
        let ledger = ledger(&effects);
        ledger.issue(&voter(), CandidateId::new(5), "Alice").unwrap();
        effects.clock.set_millis(1_000);
        ledger
            .issue(&VoterId::parse("V2").unwrap(), CandidateId::new(7), "Bob")
            .unwrap();

        let listed = ledger.list_for_audit().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].candidate_name, "Bob");

        let json = ledger.export(ExportFormat::Json).unwrap();
        let csv = ledger.export(ExportFormat::Csv).unwrap();
        for rendered in [&json, &csv] {
            assert!(!rendered.contains("V1"));
            assert!(!rendered.contains("voter"));
        }
        assert!(csv.starts_with("receipt_id,candidate,timestamp,integrity_tag\n"));
    }
}
