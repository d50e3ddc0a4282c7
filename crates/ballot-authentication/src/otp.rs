//! One-time passcode issue and validation
//!
//! At most one record exists per address (`otp/<address>`). Issuing a new code
//! overwrites the record, which both invalidates the previous code and resets
//! the attempt counter. Every read-check-write on a record runs under the
//! address's stripe lock so concurrent guesses cannot slip past the lockout.

use ballot_core::config::OtpConfig;
use ballot_core::effects::{
    numeric_code, NotificationEffects, RandomEffects, StorageEffects, StorageExt, TimeEffects,
    WriteBatch,
};
use ballot_core::{
    AuthError, ContactAddress, KeyGuard, OtpCode, Result, StripedLocks, Timestamp,
    ValidationError,
};
use ballot_journal::{AuditEvent, AuditEventType, AuditLog};
use ballot_registry::VoterDirectory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const OTP_PREFIX: &str = "otp/";

fn otp_key(address: &ContactAddress) -> String {
    format!("{OTP_PREFIX}{}", address.as_str())
}

/// Persisted passcode state for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Address the code was sent to
    pub address: ContactAddress,
    /// The live code
    pub code: OtpCode,
    /// Last instant the code is accepted
    pub expires_at: Timestamp,
    /// Mismatches since the code was issued
    pub attempts: u32,
    /// When the code was issued
    pub issued_at: Timestamp,
}

/// Outcome of a successful [`OtpAuthenticator::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpIssued {
    /// Normalized destination
    pub address: ContactAddress,
    /// Last instant the code is accepted
    pub expires_at: Timestamp,
    /// False if the notifier reported a failure; the code is still valid.
    pub delivered: bool,
}

/// A matched code whose removal is staged but not yet committed.
///
/// Holds the address lock, so no other validation for the address can run
/// until the caller has applied its batch and dropped this value.
#[must_use = "apply the batch, then call record_accepted"]
pub struct AcceptedCode<'a> {
    address: ContactAddress,
    audit: &'a AuditLog,
    _guard: KeyGuard<'a>,
}

impl AcceptedCode<'_> {
    /// Address the code was issued to.
    pub fn address(&self) -> &ContactAddress {
        &self.address
    }

    /// Log and audit the acceptance once the staged removal has committed.
    pub fn record_accepted(self) {
        tracing::info!(address = %self.address, "Passcode accepted");
        self.audit.append(AuditEvent::success(
            AuditEventType::OtpValidateSuccess,
            &self.address,
            "",
        ));
    }
}

impl std::fmt::Debug for AcceptedCode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptedCode")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Issues and checks one-time passcodes.
pub struct OtpAuthenticator {
    voters: Arc<dyn VoterDirectory>,
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
    random: Arc<dyn RandomEffects>,
    notifier: Arc<dyn NotificationEffects>,
    audit: Arc<AuditLog>,
    config: OtpConfig,
    address_locks: StripedLocks,
}

impl OtpAuthenticator {
    /// Wire an authenticator over its collaborators.
    pub fn new(
        voters: Arc<dyn VoterDirectory>,
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn TimeEffects>,
        random: Arc<dyn RandomEffects>,
        notifier: Arc<dyn NotificationEffects>,
        audit: Arc<AuditLog>,
        config: OtpConfig,
    ) -> Self {
        Self {
            voters,
            storage,
            time,
            random,
            notifier,
            audit,
            config,
            address_locks: StripedLocks::default(),
        }
    }

    /// Issue a fresh code to a registered address and hand it to the notifier.
    ///
    /// Delivery failure is audited as `OTP_DELIVERY_FAIL` and reported through
    /// [`OtpIssued::delivered`]; the stored record is kept either way.
    pub fn send(&self, address: &str) -> Result<OtpIssued> {
        let address = ContactAddress::parse(address)?;
        if self.voters.lookup_by_address(&address)?.is_none() {
            tracing::warn!(address = %address, "Passcode requested for unregistered address");
            self.audit.append(AuditEvent::failure(
                AuditEventType::OtpSendFail,
                Some(&address),
                "Address not registered",
            ));
            return Err(AuthError::UnregisteredAddress.into());
        }

        let record = {
            let _guard = self.address_locks.lock(&address);
            let issued_at = self.time.now();
            let record = OtpRecord {
                address: address.clone(),
                code: OtpCode::new(numeric_code(self.random.as_ref(), self.config.code_length)),
                expires_at: issued_at.plus_secs(self.config.ttl_secs),
                attempts: 0,
                issued_at,
            };
            self.storage.put_json(&otp_key(&address), &record)?;
            record
        };
        tracing::info!(
            address = %address,
            expires_at = record.expires_at.as_millis(),
            "Passcode issued"
        );
        self.audit
            .append(AuditEvent::success(AuditEventType::OtpSent, &address, ""));

        let delivered = match self.notifier.deliver(&address, &record.code) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(address = %address, error = %error, "Passcode delivery failed");
                self.audit.append(AuditEvent::failure(
                    AuditEventType::OtpDeliveryFail,
                    Some(&address),
                    error.to_string(),
                ));
                false
            }
        };

        Ok(OtpIssued {
            address,
            expires_at: record.expires_at,
            delivered,
        })
    }

    /// Check `input` against the live code for `address`.
    ///
    /// Checks run in order: no record, expired (record removed), locked
    /// (record kept), mismatch (attempt counted). A match consumes the record.
    pub fn validate(&self, address: &str, input: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        let accepted = self.stage_validate(address, input, &mut batch)?;
        self.storage.apply_batch(batch)?;
        accepted.record_accepted();
        Ok(())
    }

    /// Run the checks of [`validate`](Self::validate) and, on a match, add the
    /// record's removal to `batch` instead of removing it.
    ///
    /// Failed checks write their own state (attempt count, expired record) and
    /// return the error. On success the returned [`AcceptedCode`] keeps the
    /// address locked until it is dropped; apply `batch` first, then call
    /// [`AcceptedCode::record_accepted`]. Dropping it without applying the
    /// batch leaves the code valid.
    pub fn stage_validate(
        &self,
        address: &str,
        input: &str,
        batch: &mut WriteBatch,
    ) -> Result<AcceptedCode<'_>> {
        let address = ContactAddress::parse(address)?;
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "code".to_string(),
            }
            .into());
        }

        let guard = self.address_locks.lock(&address);
        let key = otp_key(&address);
        let Some(mut record) = self.storage.get_json::<OtpRecord>(&key)? else {
            self.audit.append(AuditEvent::failure(
                AuditEventType::OtpValidateFail,
                Some(&address),
                "No active code",
            ));
            return Err(AuthError::NoActiveCode.into());
        };

        if self.time.now() > record.expires_at {
            self.storage.remove(&key)?;
            tracing::info!(address = %address, "Passcode expired");
            self.audit.append(AuditEvent::failure(
                AuditEventType::OtpExpired,
                Some(&address),
                "Code expired",
            ));
            return Err(AuthError::Expired.into());
        }

        if record.attempts >= self.config.max_attempts {
            tracing::warn!(address = %address, "Passcode locked");
            self.audit.append(AuditEvent::failure(
                AuditEventType::OtpLocked,
                Some(&address),
                "Too many attempts",
            ));
            return Err(AuthError::Locked.into());
        }

        if !record.code.matches(input) {
            record.attempts += 1;
            self.storage.put_json(&key, &record)?;
            let remaining_attempts = self.config.max_attempts.saturating_sub(record.attempts);
            tracing::info!(address = %address, attempts = record.attempts, "Passcode mismatch");
            self.audit.append(AuditEvent::failure(
                AuditEventType::OtpValidateFail,
                Some(&address),
                format!(
                    "Wrong code (attempt {}/{})",
                    record.attempts, self.config.max_attempts
                ),
            ));
            return Err(AuthError::Mismatch { remaining_attempts }.into());
        }

        batch.delete(key);
        Ok(AcceptedCode {
            address,
            audit: &self.audit,
            _guard: guard,
        })
    }

    /// Current record for `address`, for inspection by operators and tests.
    pub fn record(&self, address: &ContactAddress) -> Result<Option<OtpRecord>> {
        Ok(self.storage.get_json(&otp_key(address))?)
    }

    /// Policy in force.
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }
}

impl std::fmt::Debug for OtpAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpAuthenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
