use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, UserId, VoteId};

/// What a ballot expresses: support for one candidate, or an explicit abstention.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BallotChoice {
    Candidate(CandidateId),
    VoteNo,
}

impl BallotChoice {
    /// Interpret the raw request fields. Exactly one of them must be set.
    pub fn from_parts(candidate_id: Option<CandidateId>, is_vote_no: bool) -> Option<Self> {
        match (candidate_id, is_vote_no) {
            (Some(id), false) => Some(Self::Candidate(id)),
            (None, true) => Some(Self::VoteNo),
            _ => None,
        }
    }
}

/// Core vote data, as stored in the database.
///
/// The abstention case is encoded twice (`candidate_id == None` and
/// `is_vote_no == true`); the only constructor keeps the two in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub user_id: UserId,
    pub election_id: ElectionId,
    pub candidate_id: Option<CandidateId>,
    pub is_vote_no: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a new ballot, timestamped now.
    pub fn new(user_id: UserId, election_id: ElectionId, choice: BallotChoice) -> Self {
        let (candidate_id, is_vote_no) = match choice {
            BallotChoice::Candidate(id) => (Some(id), false),
            BallotChoice::VoteNo => (None, true),
        };
        Self {
            user_id,
            election_id,
            candidate_id,
            is_vote_no,
            created_at: Utc::now(),
        }
    }

    /// The choice this ballot expresses, or `None` if the stored record is malformed.
    pub fn choice(&self) -> Option<BallotChoice> {
        BallotChoice::from_parts(self.candidate_id, self.is_vote_no)
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
///
/// Ballots are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: VoteId,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_requires_exactly_one_part() {
        assert_eq!(
            BallotChoice::from_parts(Some(3), false),
            Some(BallotChoice::Candidate(3))
        );
        assert_eq!(BallotChoice::from_parts(None, true), Some(BallotChoice::VoteNo));
        assert_eq!(BallotChoice::from_parts(None, false), None);
        assert_eq!(BallotChoice::from_parts(Some(3), true), None);
    }

    #[test]
    fn stored_shape_matches_choice() {
        let for_candidate = VoteCore::new(1, 2, BallotChoice::Candidate(7));
        assert_eq!(for_candidate.candidate_id, Some(7));
        assert!(!for_candidate.is_vote_no);
        assert_eq!(for_candidate.choice(), Some(BallotChoice::Candidate(7)));

        let abstention = VoteCore::new(1, 2, BallotChoice::VoteNo);
        assert_eq!(abstention.candidate_id, None);
        assert!(abstention.is_vote_no);
        assert_eq!(abstention.choice(), Some(BallotChoice::VoteNo));
    }
}
