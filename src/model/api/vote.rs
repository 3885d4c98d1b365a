use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, election::ElectionSummary},
    common::{CandidateId, ElectionId, UserId, VoteId},
    db::vote::Vote,
};
use crate::voting::VoteRecord;

/// A ballot the caller wishes to cast. The voter is whoever is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub election_id: ElectionId,
    #[serde(default)]
    pub candidate_id: Option<CandidateId>,
    #[serde(default)]
    pub is_vote_no: bool,
}

/// An API-friendly description of a recorded ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDescription {
    pub id: VoteId,
    pub user_id: UserId,
    pub election_id: ElectionId,
    pub candidate_id: Option<CandidateId>,
    pub is_vote_no: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteDescription {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id,
            user_id: vote.vote.user_id,
            election_id: vote.vote.election_id,
            candidate_id: vote.vote.candidate_id,
            is_vote_no: vote.vote.is_vote_no,
            created_at: vote.vote.created_at,
        }
    }
}

/// A ballot together with what it refers to, for display in a voter's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteHistoryEntry {
    #[serde(flatten)]
    pub vote: VoteDescription,
    /// Absent only if the election has since been deleted.
    pub election: Option<ElectionSummary>,
    /// Absent for abstentions.
    pub candidate: Option<CandidateDescription>,
}

impl From<VoteRecord> for VoteHistoryEntry {
    fn from(record: VoteRecord) -> Self {
        Self {
            vote: record.vote.into(),
            election: record.election.map(Into::into),
            candidate: record.candidate.map(Into::into),
        }
    }
}
