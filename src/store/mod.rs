//! The storage handle.
//!
//! Every component is handed a [`StoreHandle`] at construction and does all of
//! its reading and writing through it. The store is the single source of truth;
//! nothing above it caches votes, tallies, or eligibility.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidatePatch, election::ElectionPatch},
    common::{CandidateId, ElectionId, ElectionStatus, UserId},
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// What a cascading delete removed along with its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub candidates: u64,
    pub votes: u64,
}

/// The number of ballots in one election sharing the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCount {
    pub candidate_id: Option<CandidateId>,
    pub is_vote_no: bool,
    pub count: u64,
}

/// Persistent storage for users, elections, candidates, and votes.
///
/// Implementations enforce these rules themselves, as part of the write,
/// rather than leaving it to callers to check first:
///
/// - at most one vote per `(user_id, election_id)`, violations of which
///   surface as [`Error::Conflict`] from [`Store::insert_vote`];
/// - a vote is only recorded if [`check_ballot`] admits it against the
///   election and candidate as they stand when the vote is written;
/// - unique usernames, violations of which surface as [`Error::Conflict`]
///   from [`Store::insert_user`].
#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert a user, allocating its ID.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn user(&self, id: UserId) -> Result<Option<User>>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// All users, ordered by ID.
    async fn users(&self) -> Result<Vec<User>>;

    /// Insert an election and its initial candidates in one atomic write,
    /// allocating their IDs. Each candidate's `election_id` is replaced with
    /// the new election's ID. Candidate order is preserved.
    async fn insert_election(
        &self,
        election: NewElection,
        candidates: Vec<NewCandidate>,
    ) -> Result<(Election, Vec<Candidate>)>;

    async fn election(&self, id: ElectionId) -> Result<Option<Election>>;

    /// All elections, ordered by ID.
    async fn elections(&self) -> Result<Vec<Election>>;

    /// Apply a metadata patch. `None` if there is no such election.
    async fn update_election(&self, id: ElectionId, patch: &ElectionPatch)
        -> Result<Option<Election>>;

    /// Overwrite an election's status, but only if its current status is
    /// `required_current` (when given). The check and the write are one atomic
    /// step. `None` if there is no such election or the requirement failed.
    async fn set_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        required_current: Option<ElectionStatus>,
    ) -> Result<Option<Election>>;

    /// Add a user to an election's roll. Idempotent. `false` if there is no such election.
    async fn add_eligible_voter(&self, election_id: ElectionId, user_id: UserId) -> Result<bool>;

    /// Remove a user from an election's roll. Idempotent. `false` if there is no such election.
    async fn remove_eligible_voter(&self, election_id: ElectionId, user_id: UserId)
        -> Result<bool>;

    /// Delete an election together with all of its candidates and votes.
    /// `None` if there is no such election.
    async fn delete_election(&self, id: ElectionId) -> Result<Option<CascadeReport>>;

    /// Insert candidates, allocating their IDs. Order is preserved.
    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>>;

    async fn candidate(&self, id: CandidateId) -> Result<Option<Candidate>>;

    /// An election's candidates, ordered by ID.
    async fn candidates_for_election(&self, election_id: ElectionId) -> Result<Vec<Candidate>>;

    /// Apply a candidate patch. `None` if there is no such candidate.
    async fn update_candidate(
        &self,
        id: CandidateId,
        patch: &CandidatePatch,
    ) -> Result<Option<Candidate>>;

    /// Delete a candidate together with every vote cast for it.
    /// Returns the number of votes removed, or `None` if there is no such candidate.
    async fn delete_candidate(&self, id: CandidateId) -> Result<Option<u64>>;

    /// Record a ballot, allocating its ID.
    ///
    /// Fails with [`Error::Conflict`] if the voter already has a ballot in this
    /// election, and otherwise with whatever [`check_ballot`] reports. Both
    /// checks and the insert form one atomic step, however concurrent requests
    /// interleave.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    /// The voter's ballot in an election, if they have cast one.
    async fn vote_by(&self, user_id: UserId, election_id: ElectionId) -> Result<Option<Vote>>;

    /// Every ballot a voter has cast, ordered by ID.
    async fn votes_by_user(&self, user_id: UserId) -> Result<Vec<Vote>>;

    /// Ballot counts for an election grouped by target, read in one go.
    async fn ballot_counts(&self, election_id: ElectionId) -> Result<Vec<BallotCount>>;
}

/// Decide whether a ballot may be recorded, given the election and candidate
/// it names as they currently stand.
///
/// In order: the election must exist ([`Error::NotFound`]), be ongoing, and
/// have the candidate standing in it ([`Error::FailedPrecondition`]); then its
/// roll must admit the voter ([`Error::PermissionDenied`]).
pub(crate) fn check_ballot(
    vote: &NewVote,
    election: Option<&Election>,
    candidate: Option<&Candidate>,
) -> Result<()> {
    let election_id = vote.election_id;
    let election =
        election.ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if election.status != ElectionStatus::Ongoing {
        return Err(Error::FailedPrecondition(format!(
            "Election {election_id} is {}, not accepting votes",
            election.status
        )));
    }
    if let Some(candidate_id) = vote.candidate_id {
        let stands = candidate.map_or(false, |candidate| {
            candidate.id == candidate_id && candidate.election_id == election_id
        });
        if !stands {
            return Err(Error::FailedPrecondition(format!(
                "Candidate {candidate_id} is not standing in election {election_id}"
            )));
        }
    }
    if !election.admits(vote.user_id) {
        return Err(Error::PermissionDenied(format!(
            "User {} is not eligible to vote in election {election_id}",
            vote.user_id
        )));
    }
    Ok(())
}

/// A cheaply clonable, shareable handle on the store.
#[derive(Clone)]
pub struct StoreHandle(Arc<dyn Store>);

impl StoreHandle {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for StoreHandle {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StoreHandle {
    type Error = Error;

    /// Get the store from managed state.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.rocket().state::<StoreHandle>() {
            Some(store) => Outcome::Success(store.clone()),
            None => Outcome::Failure((
                Status::InternalServerError,
                Error::internal("Store is not managed"),
            )),
        }
    }
}
