use std::collections::HashMap;

use log::warn;
use rocket::{
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request,
};

use crate::error::{Error, Result};
use crate::model::{
    api::stats::{percentage, CandidateStats, ElectionStats},
    common::{CandidateId, ElectionId},
};
use crate::store::StoreHandle;

use super::managed_state;

/// Derives election results from the ballots on record.
///
/// Tallies are computed afresh on every call from a single grouped read of
/// the ballots, so a tally taken while voting is under way is a consistent
/// snapshot: the candidate counts and abstentions always add up to the total.
#[derive(Clone)]
pub struct TallyEngine {
    store: StoreHandle,
}

impl TallyEngine {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Count the ballots in an election.
    pub async fn compute_stats(&self, election_id: ElectionId) -> Result<ElectionStats> {
        let election = self
            .store
            .election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        let candidates = self.store.candidates_for_election(election_id).await?;
        let counts = self.store.ballot_counts(election_id).await?;

        let mut total_votes = 0;
        let mut vote_no_count = 0;
        let mut by_candidate: HashMap<CandidateId, u64> = HashMap::new();
        for count in counts {
            total_votes += count.count;
            match (count.candidate_id, count.is_vote_no) {
                (_, true) => vote_no_count += count.count,
                (Some(id), false) => *by_candidate.entry(id).or_default() += count.count,
                (None, false) => {
                    warn!(
                        "{} malformed ballots in election {election_id}",
                        count.count
                    );
                }
            }
        }

        let candidate_stats = candidates
            .into_iter()
            .map(|candidate| {
                let votes = by_candidate.remove(&candidate.id).unwrap_or(0);
                CandidateStats {
                    id: candidate.id,
                    name: candidate.candidate.name,
                    votes,
                    percentage: percentage(votes, total_votes),
                }
            })
            .collect();

        // Ballots for a candidate who has since vanished would break conservation.
        for (candidate_id, votes) in by_candidate {
            warn!("{votes} ballots in election {election_id} for unknown candidate {candidate_id}");
        }

        Ok(ElectionStats {
            election_id,
            election_title: election.election.title,
            total_votes,
            vote_no_count,
            candidate_stats,
        })
    }

    /// Count the ballots in an election and render the result as CSV.
    pub async fn export_csv(&self, election_id: ElectionId) -> Result<String> {
        Ok(self.compute_stats(election_id).await?.to_csv())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TallyEngine {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (store, _) = try_outcome!(managed_state(req));
        Outcome::Success(Self::new(store))
    }
}
