use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, ElectionId},
    db::candidate::{Candidate, NewCandidate},
};

/// A new candidate, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CandidateSpec {
    /// Check the candidate details are well-formed.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }

    /// Attach this candidate to an election.
    pub fn into_candidate(self, election_id: ElectionId) -> NewCandidate {
        NewCandidate {
            election_id,
            name: self.name.trim().to_string(),
            policy: self.policy,
            image: self.image,
        }
    }
}

/// A partial update of a candidate. Absent fields are left alone.
///
/// There is no way to move a candidate to another election.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.policy.is_none() && self.image.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }

    /// Apply this patch to a candidate in memory.
    pub fn apply(&self, candidate: &mut NewCandidate) {
        if let Some(name) = &self.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(policy) = &self.policy {
            candidate.policy = Some(policy.clone());
        }
        if let Some(image) = &self.image {
            candidate.image = Some(image.clone());
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "Candidate name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: CandidateId,
    pub election_id: ElectionId,
    pub name: String,
    pub policy: Option<String>,
    pub image: Option<String>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            election_id: candidate.candidate.election_id,
            name: candidate.candidate.name,
            policy: candidate.candidate.policy,
            image: candidate.candidate.image,
        }
    }
}
