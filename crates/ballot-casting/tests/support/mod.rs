//! Shared election fixture for the casting integration tests.

#![allow(dead_code)]

use ballot_casting::{BallotEffects, BallotService};
use ballot_core::{BallotConfig, Candidate, LedgerKey};
use ballot_testkit::TestEffects;

pub struct Election {
    pub effects: TestEffects,
    pub service: BallotService,
    pub alice: Candidate,
    pub bob: Candidate,
}

/// Voters V1 (a@x.com) and V2 (b@x.com), candidates Alice and Bob.
pub fn election(seed: u64) -> Election {
    let effects = TestEffects::deterministic(seed, 1_000);
    let service = BallotService::new(
        BallotEffects {
            storage: effects.storage.clone(),
            time: effects.clock.clone(),
            random: effects.random.clone(),
            notifier: effects.notifier.clone(),
        },
        &BallotConfig::default(),
        LedgerKey::from_bytes([3u8; 32]),
    )
    .unwrap();
    service.register_voter("V1", "Ada", "a@x.com").unwrap();
    service.register_voter("V2", "Grace", "b@x.com").unwrap();
    let alice = service.register_candidate("Alice", "Blue", "*").unwrap();
    let bob = service.register_candidate("Bob", "Red", "#").unwrap();
    Election {
        effects,
        service,
        alice,
        bob,
    }
}

impl Election {
    /// Run the passcode flow for `address` so it holds a session.
    pub fn authorize(&self, address: &str) {
        self.service.send_otp(address).unwrap();
        let code = self.effects.notifier.last_code_for(address).unwrap();
        self.service.validate_otp(address, &code).unwrap();
    }

    pub fn votes_for(&self, candidate: &Candidate) -> u64 {
        self.service
            .candidates()
            .unwrap()
            .into_iter()
            .find(|c| c.id == candidate.id)
            .map_or(0, |c| c.votes)
    }

    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.service
            .admin()
            .voters()
            .unwrap()
            .into_iter()
            .any(|v| v.voter_id.as_str() == voter_id && v.has_voted)
    }
}
