//! Caller-facing ballot service
//!
//! [`BallotService`] wires every component over one set of effects and offers
//! the operations an outer surface needs. Each returns a typed
//! [`Result`]; the caller maps [`BallotError::severity`] and
//! [`BallotError::status_code`] to its own presentation.
//!
//! [`BallotError::severity`]: ballot_core::BallotError::severity
//! [`BallotError::status_code`]: ballot_core::BallotError::status_code

use crate::caster::BallotCaster;
use ballot_authentication::{OtpAuthenticator, OtpIssued, Session, SessionGate};
use ballot_core::effects::{
    NotificationEffects, RandomEffects, StorageEffects, TimeEffects, WriteBatch,
};
use ballot_core::{
    BallotConfig, Candidate, CandidateId, ContactAddress, LedgerKey, Result, Voter,
};
use ballot_effects::{RealRandomHandler, RealTimeHandler};
use ballot_journal::{
    AuditEntry, AuditLog, ExportFormat, Receipt, ReceiptLedger, ReceiptVerification,
};
use ballot_registry::{
    CandidateTally, StoredCandidateTally, StoredVoterDirectory, TallySummary, VoterDirectory,
};
use std::sync::Arc;

/// The effect handlers a service runs on.
#[derive(Clone)]
pub struct BallotEffects {
    /// Shared key-value store for every component
    pub storage: Arc<dyn StorageEffects>,
    /// Clock
    pub time: Arc<dyn TimeEffects>,
    /// Randomness for codes, nonces and ids
    pub random: Arc<dyn RandomEffects>,
    /// Passcode delivery
    pub notifier: Arc<dyn NotificationEffects>,
}

impl BallotEffects {
    /// Wall clock and operating system randomness over `storage`.
    pub fn production(
        storage: Arc<dyn StorageEffects>,
        notifier: Arc<dyn NotificationEffects>,
    ) -> Self {
        Self {
            storage,
            time: Arc::new(RealTimeHandler::new()),
            random: Arc::new(RealRandomHandler::new()),
            notifier,
        }
    }
}

/// Complete ballot pipeline.
pub struct BallotService {
    voters: Arc<StoredVoterDirectory>,
    candidates: Arc<StoredCandidateTally>,
    audit: Arc<AuditLog>,
    otp: OtpAuthenticator,
    sessions: Arc<SessionGate>,
    receipts: Arc<ReceiptLedger>,
    caster: BallotCaster,
    storage: Arc<dyn StorageEffects>,
}

impl BallotService {
    /// Build a service after validating `config`.
    pub fn new(effects: BallotEffects, config: &BallotConfig, ledger_key: LedgerKey) -> Result<Self> {
        config.validate()?;
        let BallotEffects {
            storage,
            time,
            random,
            notifier,
        } = effects;

        let voters = Arc::new(StoredVoterDirectory::new(storage.clone(), time.clone()));
        let candidates = Arc::new(StoredCandidateTally::new(storage.clone()));
        let audit = Arc::new(AuditLog::new(storage.clone(), time.clone(), random.clone()));
        let sessions = Arc::new(SessionGate::new(
            storage.clone(),
            time.clone(),
            audit.clone(),
            config.session.clone(),
        ));
        let receipts = Arc::new(ReceiptLedger::new(
            storage.clone(),
            time.clone(),
            random.clone(),
            ledger_key,
        ));
        let otp = OtpAuthenticator::new(
            voters.clone(),
            storage.clone(),
            time.clone(),
            random,
            notifier,
            audit.clone(),
            config.otp.clone(),
        );
        let caster = BallotCaster::new(
            voters.clone(),
            candidates.clone(),
            sessions.clone(),
            receipts.clone(),
            audit.clone(),
            storage.clone(),
            time,
        );

        Ok(Self {
            voters,
            candidates,
            audit,
            otp,
            sessions,
            receipts,
            caster,
            storage,
        })
    }

    /// Issue a passcode to a registered address.
    pub fn send_otp(&self, address: &str) -> Result<OtpIssued> {
        self.otp.send(address)
    }

    /// Check a passcode; on success open a voting session for the address.
    ///
    /// Consuming the code and opening the session commit as one batch, so a
    /// storage failure leaves the code usable and no session open.
    pub fn validate_otp(&self, address: &str, code: &str) -> Result<Session> {
        let mut batch = WriteBatch::new();
        let accepted = self.otp.stage_validate(address, code, &mut batch)?;
        let session = self.sessions.stage_grant(accepted.address(), &mut batch)?;
        self.storage.apply_batch(batch)?;
        accepted.record_accepted();
        self.sessions.record_granted(&session);
        Ok(session)
    }

    /// Cast a ballot; see [`BallotCaster::cast`].
    pub fn cast(&self, voter_id: &str, candidate_id: CandidateId) -> Result<Receipt> {
        self.caster.cast(voter_id, candidate_id)
    }

    /// Identity-free receipt lookup.
    pub fn verify_receipt(&self, receipt_id: &str) -> Result<ReceiptVerification> {
        self.receipts.verify(receipt_id)
    }

    /// Render the audit log, newest first.
    pub fn export_audit_log(&self, format: ExportFormat) -> Result<String> {
        self.audit.export(format)
    }

    /// Render the redacted receipt ledger, oldest first.
    pub fn export_receipts(&self, format: ExportFormat) -> Result<String> {
        self.receipts.export(format)
    }

    /// Tally and turnout.
    pub fn results(&self) -> Result<TallySummary> {
        Ok(TallySummary::compute(
            &self.candidates.list()?,
            &self.voters.list()?,
        ))
    }

    /// Register a voter.
    pub fn register_voter(&self, voter_id: &str, name: &str, address: &str) -> Result<Voter> {
        self.voters.register(voter_id, name, address)
    }

    /// Register a candidate.
    pub fn register_candidate(&self, name: &str, party: &str, symbol: &str) -> Result<Candidate> {
        self.candidates.register(name, party, symbol)
    }

    /// Registered candidates, by id.
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        self.candidates.list()
    }

    /// Whether `address` currently holds a voting session.
    pub fn is_authorized(&self, address: &str) -> Result<bool> {
        self.sessions.check(&ContactAddress::parse(address)?)
    }

    /// Audit appends that failed and were swallowed.
    pub fn failed_audit_appends(&self) -> u64 {
        self.audit.failed_appends()
    }

    /// Privileged operations. Not part of any voter-facing flow.
    pub fn admin(&self) -> AdminHandle<'_> {
        AdminHandle { service: self }
    }
}

impl std::fmt::Debug for BallotService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BallotService").finish_non_exhaustive()
    }
}

/// Administrative access to a [`BallotService`].
#[derive(Debug)]
pub struct AdminHandle<'a> {
    service: &'a BallotService,
}

impl AdminHandle<'_> {
    /// Delete every audit entry in one batch; returns how many were removed.
    pub fn purge_audit_log(&self) -> Result<usize> {
        self.service.audit.purge()
    }

    /// Audit entries, newest first.
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        self.service.audit.query()
    }

    /// Receipts with voter ids removed, oldest first.
    pub fn receipts(&self) -> Result<Vec<Receipt>> {
        self.service.receipts.list_for_audit()
    }

    /// Registered voters, by id.
    pub fn voters(&self) -> Result<Vec<Voter>> {
        self.service.voters.list()
    }
}
