use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::candidate::CandidateDescription,
    common::{ElectionId, ElectionStatus, UserId},
    db::election::Election,
};
use crate::voting::ElectionRecord;

/// An API-friendly election description, with its candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub title: String,
    pub status: ElectionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub candidates: Vec<CandidateDescription>,
    /// The closed roll; empty for an open election.
    pub eligible_voters: Vec<UserId>,
}

impl From<ElectionRecord> for ElectionDescription {
    fn from(record: ElectionRecord) -> Self {
        let ElectionRecord {
            election,
            candidates,
        } = record;
        Self {
            id: election.id,
            title: election.election.title,
            status: election.election.status,
            start_date: election.election.start_date,
            end_date: election.election.end_date,
            candidates: candidates.into_iter().map(Into::into).collect(),
            eligible_voters: election.election.eligible_voters,
        }
    }
}

/// Just enough about an election to label something that refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub status: ElectionStatus,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            title: election.election.title,
            status: election.election.status,
        }
    }
}
