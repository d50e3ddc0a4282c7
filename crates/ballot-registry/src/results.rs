//! Election results summary

use ballot_core::{Candidate, CandidateId, Voter};
use serde::Serialize;

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    /// Candidate identifier
    pub id: CandidateId,
    /// Display name
    pub name: String,
    /// Party label
    pub party: String,
    /// Ballot symbol
    pub symbol: String,
    /// Votes counted
    pub votes: u64,
    /// Share of all votes cast, 0-100
    pub percentage: f64,
}

/// Tally and turnout at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallySummary {
    /// Ordered by votes descending, then id
    pub candidates: Vec<CandidateResult>,
    /// Sum of every candidate's votes
    pub total_votes: u64,
    /// Voters whose `has_voted` flag is set
    pub voters_participated: u64,
    /// Every registered voter
    pub registered_voters: u64,
    /// Participating share of registered voters, 0-100
    pub turnout_percentage: f64,
}

impl TallySummary {
    /// Summarize the given registries. Empty denominators yield 0%.
    pub fn compute(candidates: &[Candidate], voters: &[Voter]) -> Self {
        let total_votes: u64 = candidates.iter().map(|c| c.votes).sum();
        let voters_participated = voters.iter().filter(|v| v.has_voted).count() as u64;
        let registered_voters = voters.len() as u64;

        let mut rows: Vec<CandidateResult> = candidates
            .iter()
            .map(|c| CandidateResult {
                id: c.id,
                name: c.name.clone(),
                party: c.party.clone(),
                symbol: c.symbol.clone(),
                votes: c.votes,
                percentage: percent(c.votes, total_votes),
            })
            .collect();
        rows.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.id.cmp(&b.id)));

        Self {
            candidates: rows,
            total_votes,
            voters_participated,
            registered_voters,
            turnout_percentage: percent(voters_participated, registered_voters),
        }
    }

    /// Leading candidate, if any votes were cast.
    pub fn leader(&self) -> Option<&CandidateResult> {
        self.candidates.first().filter(|c| c.votes > 0)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_core::{ContactAddress, Timestamp, VoterId};

    fn candidate(id: u64, votes: u64) -> Candidate {
        Candidate {
            id: CandidateId::new(id),
            name: format!("C{id}"),
            party: String::new(),
            symbol: String::new(),
            votes,
        }
    }

    fn voter(id: &str, has_voted: bool) -> Voter {
        Voter {
            voter_id: VoterId::parse(id).unwrap(),
            name: id.to_string(),
            address: ContactAddress::parse(&format!("{id}@x.com")).unwrap(),
            has_voted,
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
        }
    }

    #[test]
    fn ranks_by_votes_then_id() {
        let summary = TallySummary::compute(
            &[candidate(1, 1), candidate(2, 3), candidate(3, 1)],
            &[voter("a", true), voter("b", true), voter("c", false), voter("d", false)],
        );
        let order: Vec<u64> = summary.candidates.iter().map(|c| c.id.value()).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(summary.total_votes, 5);
        assert!((summary.candidates[0].percentage - 60.0).abs() < 1e-9);
        assert!((summary.turnout_percentage - 50.0).abs() < 1e-9);
        assert_eq!(summary.leader().map(|c| c.id.value()), Some(2));
    }

    #[test]
    fn empty_election_reports_zero_percentages() {
        let summary = TallySummary::compute(&[candidate(1, 0)], &[]);
        assert_eq!(summary.candidates[0].percentage, 0.0);
        assert_eq!(summary.turnout_percentage, 0.0);
        assert!(summary.leader().is_none());
    }

    proptest::proptest! {
        #[test]
        fn percentages_cover_all_votes(votes in proptest::collection::vec(0u64..1_000, 1..12)) {
            let candidates: Vec<Candidate> = votes
                .iter()
                .enumerate()
                .map(|(i, v)| candidate(i as u64 + 1, *v))
                .collect();
            let summary = TallySummary::compute(&candidates, &[]);
            let share: f64 = summary.candidates.iter().map(|c| c.percentage).sum();
            if summary.total_votes == 0 {
                proptest::prop_assert_eq!(share, 0.0);
            } else {
                proptest::prop_assert!((share - 100.0).abs() < 1e-6);
            }
            proptest::prop_assert!(summary
                .candidates
                .windows(2)
                .all(|w| w[0].votes >= w[1].votes));
        }
    }
}
