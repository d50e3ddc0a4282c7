//! Exactly-once vote casting
//!
//! ```text
//! Unauthenticated --(passcode accepted)--> Authorized --(any cast attempt)--> Unauthenticated
//! ```
//!
//! `has_voted` on the voter is a separate, terminal flag.
//!
//! A cast holds the voter's lock from the first read to the commit, so two
//! attempts for one voter serialize and the second sees `has_voted`. The
//! candidate's lock is taken second, only once the voter-side checks pass;
//! every path acquires voter before candidate.

use ballot_authentication::SessionGate;
use ballot_core::effects::{StorageEffects, TimeEffects, WriteBatch};
use ballot_core::{BallotError, CandidateId, Result, StateError, Voter, VoterId};
use ballot_journal::{AuditEvent, AuditEventType, AuditLog, Receipt, ReceiptLedger};
use ballot_registry::{CandidateTally, VoterDirectory};
use std::sync::Arc;

/// Enforces one vote per voter and one cast attempt per session.
pub struct BallotCaster {
    voters: Arc<dyn VoterDirectory>,
    candidates: Arc<dyn CandidateTally>,
    sessions: Arc<SessionGate>,
    receipts: Arc<ReceiptLedger>,
    audit: Arc<AuditLog>,
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
}

impl BallotCaster {
    /// Wire a caster. Every collaborator must sit on `storage`.
    pub fn new(
        voters: Arc<dyn VoterDirectory>,
        candidates: Arc<dyn CandidateTally>,
        sessions: Arc<SessionGate>,
        receipts: Arc<ReceiptLedger>,
        audit: Arc<AuditLog>,
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn TimeEffects>,
    ) -> Self {
        Self {
            voters,
            candidates,
            sessions,
            receipts,
            audit,
            storage,
            time,
        }
    }

    /// Cast `voter_id`'s ballot for `candidate_id`.
    ///
    /// Preconditions, each a distinct failure, in order: the voter exists, the
    /// voter's address holds a live session, the voter has not voted, the
    /// candidate exists. On success the tally increment, the `has_voted` flag,
    /// the receipt and the session removal commit as one batch.
    ///
    /// Once the voter is known the session is consumed whatever the outcome.
    pub fn cast(&self, voter_id: &str, candidate_id: CandidateId) -> Result<Receipt> {
        let voter_id = VoterId::parse(voter_id)?;
        let _voter_guard = self.voters.lock_voter(&voter_id);

        let Some(voter) = self.voters.lookup_by_id(&voter_id)? else {
            return Err(self.reject(None, StateError::InvalidVoter.into()));
        };

        match self.commit_cast(&voter, candidate_id) {
            Ok(receipt) => {
                self.sessions.record_revoked(&voter.address);
                tracing::info!(address = %voter.address, "Ballot cast");
                self.audit.append(AuditEvent::success(
                    AuditEventType::VoteCast,
                    &voter.address,
                    "",
                ));
                Ok(receipt)
            }
            Err(error) => {
                if let Err(revoke_error) = self.sessions.revoke(&voter.address) {
                    tracing::error!(
                        address = %voter.address,
                        error = %revoke_error,
                        "Could not revoke session after rejected cast"
                    );
                    return Err(self.reject(Some(&voter), revoke_error));
                }
                Err(self.reject(Some(&voter), error))
            }
        }
    }

    fn commit_cast(&self, voter: &Voter, candidate_id: CandidateId) -> Result<Receipt> {
        if !self.sessions.check(&voter.address)? {
            return Err(StateError::NotAuthenticated.into());
        }
        if voter.has_voted {
            return Err(StateError::AlreadyVoted.into());
        }

        let _candidate_guard = self.candidates.lock_candidate(candidate_id);
        let candidate = self
            .candidates
            .lookup_by_id(candidate_id)?
            .ok_or(StateError::InvalidCandidate)?;

        let mut batch = WriteBatch::new();
        self.candidates.stage_increment(&candidate, &mut batch)?;
        self.voters
            .stage_mark_voted(voter, self.time.now(), &mut batch)?;
        let receipt = self.receipts.stage_issue(
            &voter.voter_id,
            candidate.id,
            &candidate.name,
            &mut batch,
        )?;
        self.sessions.stage_revoke(&voter.address, &mut batch);
        self.storage.apply_batch(batch)?;
        Ok(receipt)
    }

    /// Audit a rejected attempt. Details carry the failure kind only.
    fn reject(&self, voter: Option<&Voter>, error: BallotError) -> BallotError {
        let address = voter.map(|v| &v.address);
        tracing::info!(kind = error.kind(), "Cast rejected");
        self.audit.append(AuditEvent::failure(
            AuditEventType::VoteRejected,
            address,
            error.kind(),
        ));
        error
    }
}

impl std::fmt::Debug for BallotCaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BallotCaster").finish_non_exhaustive()
    }
}
