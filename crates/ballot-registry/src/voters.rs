//! Voter directory
//!
//! Each voter is stored once under `voters/id/<voterId>`; a second key
//! `voters/address/<address>` holds the voter id so address lookups are a
//! targeted read rather than a scan.

use ballot_core::effects::{StorageEffects, StorageExt, TimeEffects, WriteBatch};
use ballot_core::{
    ContactAddress, KeyGuard, Result, StateError, StripedLocks, Timestamp,
    ValidationError, Voter, VoterId,
};
use parking_lot::Mutex;
use std::sync::Arc;

const VOTER_PREFIX: &str = "voters/id/";
const ADDRESS_PREFIX: &str = "voters/address/";

fn voter_key(voter_id: &VoterId) -> String {
    format!("{VOTER_PREFIX}{}", voter_id.as_str())
}

fn address_key(address: &ContactAddress) -> String {
    format!("{ADDRESS_PREFIX}{}", address.as_str())
}

/// Registered voters, as seen by the ballot pipeline.
pub trait VoterDirectory: Send + Sync {
    /// Voter registered with `address`, if any.
    fn lookup_by_address(&self, address: &ContactAddress) -> Result<Option<Voter>>;

    /// Voter registered as `voter_id`, if any.
    fn lookup_by_id(&self, voter_id: &VoterId) -> Result<Option<Voter>>;

    /// Hold the per-voter lock. Read-check-write sequences on one voter must
    /// run while the guard is alive.
    fn lock_voter(&self, voter_id: &VoterId) -> KeyGuard<'_>;

    /// Add the `has_voted = true` transition for `voter` to `batch` and return
    /// the updated record. Fails with `AlreadyVoted` if the flag is set.
    ///
    /// The caller must hold [`lock_voter`](Self::lock_voter) for this voter.
    fn stage_mark_voted(
        &self,
        voter: &Voter,
        at: Timestamp,
        batch: &mut WriteBatch,
    ) -> Result<Voter>;

    /// Set `has_voted` for `voter_id` and commit immediately.
    fn mark_voted(&self, voter_id: &VoterId) -> Result<Voter>;

    /// Every registered voter, ordered by id.
    fn list(&self) -> Result<Vec<Voter>>;
}

/// [`VoterDirectory`] over the shared key-value store.
pub struct StoredVoterDirectory {
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
    voter_locks: StripedLocks,
    registration: Mutex<()>,
}

impl StoredVoterDirectory {
    /// Create a directory on `storage`.
    pub fn new(storage: Arc<dyn StorageEffects>, time: Arc<dyn TimeEffects>) -> Self {
        Self {
            storage,
            time,
            voter_locks: StripedLocks::default(),
            registration: Mutex::new(()),
        }
    }

    /// Register a voter. Both the id and the address must be unused.
    pub fn register(&self, voter_id: &str, name: &str, address: &str) -> Result<Voter> {
        let voter_id = VoterId::parse(voter_id)?;
        let address = ContactAddress::parse(address)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "name".to_string(),
            }
            .into());
        }

        let _registration = self.registration.lock();
        if self.storage.retrieve(&voter_key(&voter_id))?.is_some() {
            return Err(ValidationError::DuplicateVoterId {
                voter_id: voter_id.to_string(),
            }
            .into());
        }
        if self.storage.retrieve(&address_key(&address))?.is_some() {
            return Err(ValidationError::DuplicateAddress.into());
        }

        let now = self.time.now();
        let voter = Voter {
            voter_id,
            name: name.to_string(),
            address,
            has_voted: false,
            created_at: now,
            updated_at: now,
        };
        let mut batch = WriteBatch::new();
        batch.put_json(voter_key(&voter.voter_id), &voter)?;
        batch.put_json(address_key(&voter.address), &voter.voter_id)?;
        self.storage.apply_batch(batch)?;

        tracing::info!(voter_id = %voter.voter_id, "Voter registered");
        Ok(voter)
    }
}

impl VoterDirectory for StoredVoterDirectory {
    fn lookup_by_address(&self, address: &ContactAddress) -> Result<Option<Voter>> {
        match self.storage.get_json::<VoterId>(&address_key(address))? {
            Some(voter_id) => self.lookup_by_id(&voter_id),
            None => Ok(None),
        }
    }

    fn lookup_by_id(&self, voter_id: &VoterId) -> Result<Option<Voter>> {
        Ok(self.storage.get_json(&voter_key(voter_id))?)
    }

    fn lock_voter(&self, voter_id: &VoterId) -> KeyGuard<'_> {
        self.voter_locks.lock(voter_id)
    }

    fn stage_mark_voted(
        &self,
        voter: &Voter,
        at: Timestamp,
        batch: &mut WriteBatch,
    ) -> Result<Voter> {
        if voter.has_voted {
            return Err(StateError::AlreadyVoted.into());
        }
        let updated = Voter {
            has_voted: true,
            updated_at: at,
            ..voter.clone()
        };
        batch.put_json(voter_key(&updated.voter_id), &updated)?;
        Ok(updated)
    }

    fn mark_voted(&self, voter_id: &VoterId) -> Result<Voter> {
        let _guard = self.lock_voter(voter_id);
        let voter = self
            .lookup_by_id(voter_id)?
            .ok_or(StateError::InvalidVoter)?;
        let mut batch = WriteBatch::new();
        let updated = self.stage_mark_voted(&voter, self.time.now(), &mut batch)?;
        self.storage.apply_batch(batch)?;
        Ok(updated)
    }

    fn list(&self) -> Result<Vec<Voter>> {
        let mut voters = Vec::new();
        for key in self.storage.list_keys(VOTER_PREFIX)? {
            // A key listed a moment ago may be gone; only decode what is there.
            if let Some(voter) = self.storage.get_json::<Voter>(&key)? {
                voters.push(voter);
            }
        }
        Ok(voters)
    }
}

impl std::fmt::Debug for StoredVoterDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredVoterDirectory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ballot_core::BallotError;
    use ballot_testkit::TestEffects;

    fn directory(effects: &TestEffects) -> StoredVoterDirectory {
        StoredVoterDirectory::new(effects.storage.clone(), effects.clock.clone())
    }

    #[test]
    fn register_indexes_by_id_and_address() {
        let effects = TestEffects::deterministic(1, 5_000);
        let voters = directory(&effects);
        voters.register("V1", "Ada", " A@X.com ").unwrap();

        let by_address = voters
            .lookup_by_address(&ContactAddress::parse("a@x.com").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(by_address.voter_id.as_str(), "V1");
        assert!(!by_address.has_voted);
        assert_eq!(by_address.created_at, Timestamp::from_millis(5_000));
    }

    #[test]
    fn duplicate_id_or_address_is_rejected() {
        let effects = TestEffects::deterministic(1, 0);
        let voters = directory(&effects);
        voters.register("V1", "Ada", "a@x.com").unwrap();

        assert_matches!(
            voters.register("V1", "Bob", "b@x.com"),
            Err(BallotError::Validation(ValidationError::DuplicateVoterId { .. }))
        );
        assert_matches!(
            voters.register("V2", "Bob", "A@x.com"),
            Err(BallotError::Validation(ValidationError::DuplicateAddress))
        );
        assert_eq!(voters.list().unwrap().len(), 1);
    }

    #[test]
    fn mark_voted_is_one_way() {
        let effects = TestEffects::deterministic(1, 0);
        let voters = directory(&effects);
        voters.register("V1", "Ada", "a@x.com").unwrap();
        let id = VoterId::parse("V1").unwrap();

        effects.clock.advance_secs(10);
        let voted = voters.mark_voted(&id).unwrap();
        assert!(voted.has_voted);
        assert_eq!(voted.updated_at, Timestamp::from_millis(10_000));

        assert_matches!(
            voters.mark_voted(&id),
            Err(BallotError::State(StateError::AlreadyVoted))
        );
        assert_matches!(
            voters.mark_voted(&VoterId::parse("V9").unwrap()),
            Err(BallotError::State(StateError::InvalidVoter))
        );
    }

    #[test]
    fn staged_transition_is_invisible_until_applied() {
        let effects = TestEffects::deterministic(1, 0);
        let voters = directory(&effects);
        let voter = voters.register("V1", "Ada", "a@x.com").unwrap();

        let mut batch = WriteBatch::new();
        voters
            .stage_mark_voted(&voter, Timestamp::from_millis(1), &mut batch)
            .unwrap();
        assert!(!voters.lookup_by_id(&voter.voter_id).unwrap().unwrap().has_voted);

        effects.storage.apply_batch(batch).unwrap();
        assert!(voters.lookup_by_id(&voter.voter_id).unwrap().unwrap().has_voted);
    }
}
