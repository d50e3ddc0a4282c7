//! Candidate tally
//!
//! Candidates live under `candidates/id/<id>` with the id zero-padded so the
//! sorted key listing is also the numeric order. `candidates/next-id` holds
//! the next id to assign.

use ballot_core::effects::{StorageEffects, StorageExt, WriteBatch};
use ballot_core::{
    Candidate, CandidateId, KeyGuard, Result, StateError, StripedLocks, ValidationError,
};
use parking_lot::Mutex;
use std::sync::Arc;

const CANDIDATE_PREFIX: &str = "candidates/id/";
const NEXT_ID_KEY: &str = "candidates/next-id";
const FIRST_CANDIDATE_ID: u64 = 1;

fn candidate_key(id: CandidateId) -> String {
    format!("{CANDIDATE_PREFIX}{:020}", id.value())
}

/// Candidates and their running vote counts.
pub trait CandidateTally: Send + Sync {
    /// Candidate registered as `id`, if any.
    fn lookup_by_id(&self, id: CandidateId) -> Result<Option<Candidate>>;

    /// Hold the per-candidate lock.
    fn lock_candidate(&self, id: CandidateId) -> KeyGuard<'_>;

    /// Add a one-vote increment for `candidate` to `batch` and return the
    /// updated record. The caller must hold
    /// [`lock_candidate`](Self::lock_candidate) for this candidate.
    fn stage_increment(&self, candidate: &Candidate, batch: &mut WriteBatch) -> Result<Candidate>;

    /// Add one vote to `id` and commit immediately.
    fn increment_votes(&self, id: CandidateId) -> Result<Candidate>;

    /// Every candidate, ordered by id.
    fn list(&self) -> Result<Vec<Candidate>>;
}

/// [`CandidateTally`] over the shared key-value store.
pub struct StoredCandidateTally {
    storage: Arc<dyn StorageEffects>,
    candidate_locks: StripedLocks,
    registration: Mutex<()>,
}

impl StoredCandidateTally {
    /// Create a tally on `storage`.
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self {
            storage,
            candidate_locks: StripedLocks::default(),
            registration: Mutex::new(()),
        }
    }

    /// Register a candidate with zero votes and the next free id.
    pub fn register(&self, name: &str, party: &str, symbol: &str) -> Result<Candidate> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "name".to_string(),
            }
            .into());
        }

        let _registration = self.registration.lock();
        let next = self
            .storage
            .get_json::<u64>(NEXT_ID_KEY)?
            .unwrap_or(FIRST_CANDIDATE_ID);
        let candidate = Candidate {
            id: CandidateId::new(next),
            name: name.to_string(),
            party: party.trim().to_string(),
            symbol: symbol.trim().to_string(),
            votes: 0,
        };

        let mut batch = WriteBatch::new();
        batch.put_json(candidate_key(candidate.id), &candidate)?;
        batch.put_json(NEXT_ID_KEY, &(next + 1))?;
        self.storage.apply_batch(batch)?;

        tracing::info!(candidate_id = %candidate.id, "Candidate registered");
        Ok(candidate)
    }
}

impl CandidateTally for StoredCandidateTally {
    fn lookup_by_id(&self, id: CandidateId) -> Result<Option<Candidate>> {
        Ok(self.storage.get_json(&candidate_key(id))?)
    }

    fn lock_candidate(&self, id: CandidateId) -> KeyGuard<'_> {
        self.candidate_locks.lock(&id)
    }

    fn stage_increment(&self, candidate: &Candidate, batch: &mut WriteBatch) -> Result<Candidate> {
        let updated = Candidate {
            votes: candidate.votes.saturating_add(1),
            ..candidate.clone()
        };
        batch.put_json(candidate_key(updated.id), &updated)?;
        Ok(updated)
    }

    fn increment_votes(&self, id: CandidateId) -> Result<Candidate> {
        let _guard = self.lock_candidate(id);
        let candidate = self.lookup_by_id(id)?.ok_or(StateError::InvalidCandidate)?;
        let mut batch = WriteBatch::new();
        let updated = self.stage_increment(&candidate, &mut batch)?;
        self.storage.apply_batch(batch)?;
        Ok(updated)
    }

    fn list(&self) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        for key in self.storage.list_keys(CANDIDATE_PREFIX)? {
            if let Some(candidate) = self.storage.get_json::<Candidate>(&key)? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }
}

impl std::fmt::Debug for StoredCandidateTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCandidateTally").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ballot_core::BallotError;
    use ballot_effects::MemoryStorageHandler;

    fn tally() -> StoredCandidateTally {
        StoredCandidateTally::new(Arc::new(MemoryStorageHandler::new()))
    }

    #[test]
    fn ids_are_assigned_in_sequence() {
        let tally = tally();
        let alice = tally.register("Alice", "Blue", "*").unwrap();
        let bob = tally.register("Bob", "Red", "#").unwrap();
        assert_eq!(alice.id, CandidateId::new(1));
        assert_eq!(bob.id, CandidateId::new(2));
        assert_eq!(bob.votes, 0);
    }

    #[test]
    fn list_orders_numerically_past_nine() {
        let tally = tally();
        for i in 0..11 {
            tally.register(&format!("C{i}"), "", "").unwrap();
        }
        let ids: Vec<u64> = tally.list().unwrap().iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn increment_adds_exactly_one() {
        let tally = tally();
        let alice = tally.register("Alice", "Blue", "*").unwrap();
        tally.increment_votes(alice.id).unwrap();
        let after = tally.increment_votes(alice.id).unwrap();
        assert_eq!(after.votes, 2);
        assert_eq!(tally.lookup_by_id(alice.id).unwrap().unwrap().votes, 2);
    }

    #[test]
    fn unknown_candidate_and_blank_name_fail() {
        let tally = tally();
        assert_matches!(
            tally.increment_votes(CandidateId::new(5)),
            Err(BallotError::State(StateError::InvalidCandidate))
        );
        assert_matches!(
            tally.register("  ", "Blue", "*"),
            Err(BallotError::Validation(ValidationError::EmptyField { .. }))
        );
    }
}
