//! Audit log
//!
//! Entries are stored one per key under `audit/entry/<seq>` (zero-padded) and
//! are never rewritten. Appends are best-effort: a storage failure is logged,
//! counted in [`AuditLog::failed_appends`] and otherwise swallowed, so an audit
//! problem can neither fail a successful operation nor mask a failed one.

use crate::export::{csv_record, rfc3339, ExportFormat};
use ballot_core::effects::{RandomEffects, StorageEffects, StorageExt, TimeEffects, WriteBatch};
use ballot_core::{ContactAddress, Result, StorageError, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const ENTRY_PREFIX: &str = "audit/entry/";
const NEXT_SEQ_KEY: &str = "audit/next-seq";
const CSV_HEADER: [&str; 5] = ["timestamp", "address", "event", "status", "details"];

fn entry_key(sequence: u64) -> String {
    format!("{ENTRY_PREFIX}{sequence:020}")
}

/// Kinds of recorded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// Passcode issued
    OtpSent,
    /// Passcode requested for an unregistered address
    OtpSendFail,
    /// Notifier could not deliver an issued passcode
    OtpDeliveryFail,
    /// Passcode accepted and consumed
    OtpValidateSuccess,
    /// No live code, or a wrong code
    OtpValidateFail,
    /// Code presented after its expiry
    OtpExpired,
    /// Attempt budget exhausted
    OtpLocked,
    /// Voting session opened
    SessionGranted,
    /// Voting session removed
    SessionRevoked,
    /// Ballot counted
    VoteCast,
    /// Cast attempt refused
    VoteRejected,
}

impl AuditEventType {
    /// Stable upper-case name, as written to exports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OtpSent => "OTP_SENT",
            Self::OtpSendFail => "OTP_SEND_FAIL",
            Self::OtpDeliveryFail => "OTP_DELIVERY_FAIL",
            Self::OtpValidateSuccess => "OTP_VALIDATE_SUCCESS",
            Self::OtpValidateFail => "OTP_VALIDATE_FAIL",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::OtpLocked => "OTP_LOCKED",
            Self::SessionGranted => "SESSION_GRANTED",
            Self::SessionRevoked => "SESSION_REVOKED",
            Self::VoteCast => "VOTE_CAST",
            Self::VoteRejected => "VOTE_REJECTED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a component reports; the log stamps it with time, sequence and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// What happened
    pub event_type: AuditEventType,
    /// Address involved, when one is known
    pub address: Option<ContactAddress>,
    /// Whether the step succeeded
    pub success: bool,
    /// Free text; never a code, candidate or receipt
    pub details: String,
}

impl AuditEvent {
    /// Successful event for `address`.
    pub fn success(
        event_type: AuditEventType,
        address: &ContactAddress,
        details: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            address: Some(address.clone()),
            success: true,
            details: details.into(),
        }
    }

    /// Failed event for `address`, or for no known address.
    pub fn failure(
        event_type: AuditEventType,
        address: Option<&ContactAddress>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            address: address.cloned(),
            success: false,
            details: details.into(),
        }
    }
}

/// A persisted audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Random entry identifier
    pub id: Uuid,
    /// Position in append order, never reused
    pub sequence: u64,
    /// When the entry was appended
    pub timestamp: Timestamp,
    /// Address involved, when one is known
    pub address: Option<ContactAddress>,
    /// What happened
    pub event_type: AuditEventType,
    /// Whether the step succeeded
    pub success: bool,
    /// Free text supplied by the reporting component
    pub details: String,
}

/// Append-only audit log over the shared store.
pub struct AuditLog {
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
    random: Arc<dyn RandomEffects>,
    append_lock: Mutex<()>,
    failed_appends: AtomicU64,
}

impl AuditLog {
    /// Create a log over `storage`.
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn TimeEffects>,
        random: Arc<dyn RandomEffects>,
    ) -> Self {
        Self {
            storage,
            time,
            random,
            append_lock: Mutex::new(()),
            failed_appends: AtomicU64::new(0),
        }
    }

    /// Record `event`. Never fails; see [`failed_appends`](Self::failed_appends).
    pub fn append(&self, event: AuditEvent) {
        let event_type = event.event_type;
        if let Err(error) = self.try_append(event) {
            self.failed_appends.fetch_add(1, Ordering::Relaxed);
            tracing::error!(event = %event_type, error = %error, "Audit append failed");
        }
    }

    /// Appends swallowed since this log was created.
    pub fn failed_appends(&self) -> u64 {
        self.failed_appends.load(Ordering::Relaxed)
    }

    fn try_append(&self, event: AuditEvent) -> std::result::Result<AuditEntry, StorageError> {
        let _append = self.append_lock.lock();
        let sequence = self.storage.get_json::<u64>(NEXT_SEQ_KEY)?.unwrap_or(0);
        let entry = AuditEntry {
            id: self.next_id(),
            sequence,
            timestamp: self.time.now(),
            address: event.address,
            event_type: event.event_type,
            success: event.success,
            details: event.details,
        };

        let mut batch = WriteBatch::new();
        batch.put_json(entry_key(sequence), &entry)?;
        batch.put_json(NEXT_SEQ_KEY, &(sequence + 1))?;
        self.storage.apply_batch(batch)?;
        Ok(entry)
    }

    fn next_id(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.random.random_bytes(16));
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Every entry, newest first.
    pub fn query(&self) -> Result<Vec<AuditEntry>> {
        let mut entries = Vec::new();
        for key in self.storage.list_keys(ENTRY_PREFIX)? {
            if let Some(entry) = self.storage.get_json::<AuditEntry>(&key)? {
                entries.push(entry);
            }
        }
        entries.reverse();
        Ok(entries)
    }

    /// Entries concerning `address`, newest first.
    pub fn query_address(&self, address: &ContactAddress) -> Result<Vec<AuditEntry>> {
        Ok(self
            .query()?
            .into_iter()
            .filter(|entry| entry.address.as_ref() == Some(address))
            .collect())
    }

    /// Render the log, newest first.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let entries = self.query()?;
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&entries).map_err(|e| {
                StorageError::Codec {
                    key: ENTRY_PREFIX.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            ExportFormat::Csv => {
                let mut out = csv_record(CSV_HEADER);
                for entry in &entries {
                    out.push_str(&csv_record([
                        rfc3339(entry.timestamp),
                        entry
                            .address
                            .as_ref()
                            .map(|a| a.as_str().to_string())
                            .unwrap_or_default(),
                        entry.event_type.as_str().to_string(),
                        if entry.success { "success" } else { "failure" }.to_string(),
                        entry.details.clone(),
                    ]));
                }
                Ok(out)
            }
        }
    }

    /// Remove every entry in one batch; returns how many were removed.
    ///
    /// Privileged: reachable only through the administrative handle. Sequence
    /// numbers keep counting from where they were.
    pub fn purge(&self) -> Result<usize> {
        let _append = self.append_lock.lock();
        let keys = self.storage.list_keys(ENTRY_PREFIX)?;
        let mut batch = WriteBatch::new();
        for key in &keys {
            batch.delete(key.as_str());
        }
        self.storage.apply_batch(batch)?;
        tracing::warn!(removed = keys.len(), "Audit log purged");
        Ok(keys.len())
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("failed_appends", &self.failed_appends())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_testkit::TestEffects;

    fn log(effects: &TestEffects) -> AuditLog {
        AuditLog::new(
            effects.storage.clone(),
            effects.clock.clone(),
            effects.random.clone(),
        )
    }

    fn address() -> ContactAddress {
        ContactAddress::parse("a@x.com").unwrap()
    }

    #[test]
    fn query_is_newest_first() {
        let effects = TestEffects::deterministic(3, 1_000);
        let audit = log(&effects);
        audit.append(AuditEvent::success(AuditEventType::OtpSent, &address(), ""));
        effects.clock.advance_secs(1);
        audit.append(AuditEvent::failure(
            AuditEventType::OtpValidateFail,
            Some(&address()),
            "MISMATCH",
        ));

        let entries = audit.query().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, AuditEventType::OtpValidateFail);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[1].timestamp, Timestamp::from_millis(1_000));
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn storage_failure_is_counted_not_raised() {
        let effects = TestEffects::deterministic(3, 0);
        let audit = log(&effects);
        effects.storage.fail_writes_under("audit/");
        audit.append(AuditEvent::success(AuditEventType::OtpSent, &address(), ""));
        assert_eq!(audit.failed_appends(), 1);

        effects.storage.heal();
        assert!(audit.query().unwrap().is_empty());
    }

    #[test]
    fn csv_export_has_header_and_escapes_details() {
        let effects = TestEffects::deterministic(3, 0);
        let audit = log(&effects);
        audit.append(AuditEvent::failure(
            AuditEventType::OtpSendFail,
            None,
            "unknown, unregistered",
        ));

        let csv = audit.export(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,address,event,status,details"));
        assert_eq!(
            lines.next(),
            Some("1970-01-01T00:00:00.000Z,,OTP_SEND_FAIL,failure,\"unknown, unregistered\"")
        );
    }

    #[test]
    fn json_export_uses_event_names() {
        let effects = TestEffects::deterministic(3, 0);
        let audit = log(&effects);
        audit.append(AuditEvent::success(AuditEventType::VoteCast, &address(), ""));
        let json = audit.export(ExportFormat::Json).unwrap();
        assert!(json.contains("\"VOTE_CAST\""));
    }

    #[test]
    fn purge_removes_everything_and_sequence_continues() {
        let effects = TestEffects::deterministic(3, 0);
        let audit = log(&effects);
        for _ in 0..3 {
            audit.append(AuditEvent::success(AuditEventType::OtpSent, &address(), ""));
        }
        assert_eq!(audit.purge().unwrap(), 3);
        assert!(audit.query().unwrap().is_empty());

        audit.append(AuditEvent::success(AuditEventType::OtpSent, &address(), ""));
        assert_eq!(audit.query().unwrap()[0].sequence, 3);
    }

    #[test]
    fn failed_purge_leaves_log_intact() {
        let effects = TestEffects::deterministic(3, 0);
        let audit = log(&effects);
        audit.append(AuditEvent::success(AuditEventType::OtpSent, &address(), ""));
        effects.storage.fail_writes_under("audit/entry/");
        assert!(audit.purge().is_err());
        effects.storage.heal();
        assert_eq!(audit.query().unwrap().len(), 1);
        assert!(effects.storage.list_keys("audit/").unwrap().len() >= 2);
    }
}
