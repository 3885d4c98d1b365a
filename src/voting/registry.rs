use log::{debug, info};
use rocket::{
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        candidate::{CandidatePatch, CandidateSpec},
        election::{validate_dates, ElectionPatch, ElectionSpec},
    },
    common::{CandidateId, ElectionId, ElectionStatus, TransitionPolicy},
    db::{
        candidate::Candidate,
        election::{Election, NewElection},
    },
};
use crate::store::{CascadeReport, StoreHandle};

use super::{managed_state, ElectionRecord};

/// Owns elections, their candidates, and the election lifecycle.
#[derive(Clone)]
pub struct ElectionRegistry {
    store: StoreHandle,
    policy: TransitionPolicy,
}

impl ElectionRegistry {
    pub fn new(store: StoreHandle, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    /// Create an election and its initial candidates.
    pub async fn create_election(&self, spec: ElectionSpec) -> Result<ElectionRecord> {
        spec.validate()?;
        // The store fills in the election ID.
        let candidates = spec
            .candidates
            .iter()
            .cloned()
            .map(|candidate| candidate.into_candidate(ElectionId::default()))
            .collect();
        let (election, candidates) = self
            .store
            .insert_election(NewElection::from(spec), candidates)
            .await?;
        info!(
            "Created election {} '{}' ({}) with {} candidates",
            election.id,
            election.title,
            election.status,
            candidates.len()
        );
        Ok(ElectionRecord {
            election,
            candidates,
        })
    }

    /// Get an election by ID, without its candidates.
    pub async fn election(&self, id: ElectionId) -> Result<Election> {
        self.store
            .election(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {id}")))
    }

    /// Get an election by ID, with its candidates.
    pub async fn get_election(&self, id: ElectionId) -> Result<ElectionRecord> {
        let election = self.election(id).await?;
        let candidates = self.store.candidates_for_election(id).await?;
        Ok(ElectionRecord {
            election,
            candidates,
        })
    }

    /// All elections in ID order, each with its candidates.
    pub async fn list_elections(&self) -> Result<Vec<ElectionRecord>> {
        let elections = self.store.elections().await?;
        let mut records = Vec::with_capacity(elections.len());
        for election in elections {
            let candidates = self.store.candidates_for_election(election.id).await?;
            records.push(ElectionRecord {
                election,
                candidates,
            });
        }
        Ok(records)
    }

    /// Change an election's title or dates.
    pub async fn update_election(
        &self,
        id: ElectionId,
        patch: ElectionPatch,
    ) -> Result<ElectionRecord> {
        patch.validate()?;

        // The patched dates must still make sense alongside the unpatched ones.
        let mut preview = self.election(id).await?.election;
        patch.apply(&mut preview);
        validate_dates(preview.start_date, preview.end_date)?;

        let election = self
            .store
            .update_election(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
        debug!("Updated election {id}");
        let candidates = self.store.candidates_for_election(id).await?;
        Ok(ElectionRecord {
            election,
            candidates,
        })
    }

    /// Move an election to a new lifecycle status.
    ///
    /// Under [`TransitionPolicy::Permissive`] any status may be set from any
    /// other. Under [`TransitionPolicy::Strict`] only single forward steps and
    /// no-ops are allowed, and the step is applied only if the status it
    /// starts from is still current when the write lands.
    pub async fn set_status(&self, id: ElectionId, status: ElectionStatus) -> Result<Election> {
        let required_current = match self.policy {
            TransitionPolicy::Permissive => None,
            TransitionPolicy::Strict => {
                let current = self.election(id).await?;
                if current.status == status {
                    return Ok(current);
                }
                if !current.status.advances_to(status) {
                    return Err(Error::FailedPrecondition(format!(
                        "Election {id} cannot move from {} to {status}",
                        current.status
                    )));
                }
                ElectionStatus::strict_predecessor(status)
            }
        };

        match self.store.set_status(id, status, required_current).await? {
            Some(election) => {
                info!("Election {id} is now {status}");
                Ok(election)
            }
            None => {
                // Either the election vanished or its status changed underneath us.
                let current = self.election(id).await?;
                Err(Error::FailedPrecondition(format!(
                    "Election {id} cannot move from {} to {status}",
                    current.status
                )))
            }
        }
    }

    /// Delete an election along with all of its candidates and votes.
    pub async fn delete_election(&self, id: ElectionId) -> Result<CascadeReport> {
        let report = self
            .store
            .delete_election(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
        info!(
            "Deleted election {id} with {} candidates and {} votes",
            report.candidates, report.votes
        );
        Ok(report)
    }

    /// Add a candidate to an existing election.
    pub async fn add_candidate(
        &self,
        election_id: ElectionId,
        spec: CandidateSpec,
    ) -> Result<Candidate> {
        spec.validate()?;
        // Ensure the election exists.
        self.election(election_id).await?;
        let mut inserted = self
            .store
            .insert_candidates(vec![spec.into_candidate(election_id)])
            .await?;
        let candidate = inserted
            .pop()
            .ok_or_else(|| Error::internal("Candidate insert returned nothing"))?;
        info!(
            "Added candidate {} '{}' to election {election_id}",
            candidate.id, candidate.name
        );
        Ok(candidate)
    }

    /// The candidates standing in an election, in ID order.
    pub async fn list_candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        self.election(election_id).await?;
        self.store.candidates_for_election(election_id).await
    }

    pub async fn get_candidate(&self, id: CandidateId) -> Result<Candidate> {
        self.store
            .candidate(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
    }

    /// Change a candidate's name, policy, or image.
    pub async fn update_candidate(
        &self,
        id: CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate> {
        patch.validate()?;
        self.store
            .update_candidate(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
    }

    /// Delete a candidate and every vote cast for them. Returns the number of
    /// votes removed.
    pub async fn delete_candidate(&self, id: CandidateId) -> Result<u64> {
        let votes = self
            .store
            .delete_candidate(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))?;
        info!("Deleted candidate {id} and {votes} votes cast for them");
        Ok(votes)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ElectionRegistry {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (store, config) = try_outcome!(managed_state(req));
        Outcome::Success(Self::new(store, config.transition_policy()))
    }
}
