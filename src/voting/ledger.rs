use log::{debug, info, warn};
use rocket::{
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request,
};

use crate::error::{Error, Result};
use crate::model::{
    common::{CandidateId, ElectionId, UserId},
    db::vote::{BallotChoice, Vote, VoteCore},
};
use crate::store::StoreHandle;

use super::{managed_state, VoteRecord};

/// The append-only record of cast ballots.
///
/// A ballot is never updated or deleted through the ledger. The only ways a
/// ballot leaves the store are the cascades run when its election or
/// candidate is deleted.
#[derive(Clone)]
pub struct BallotLedger {
    store: StoreHandle,
}

impl BallotLedger {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Record a voter's ballot in an election.
    ///
    /// Checks run in a fixed order and the first to fail decides the error:
    ///
    /// 1. the voter has not voted in this election yet ([`Error::Conflict`]);
    /// 2. exactly one of `candidate_id` and `is_vote_no` is given
    ///    ([`Error::InvalidArgument`]);
    /// 3. the election exists ([`Error::NotFound`]), is ongoing, and the
    ///    candidate stands in it ([`Error::FailedPrecondition`]);
    /// 4. the voter is on the roll ([`Error::PermissionDenied`]).
    ///
    /// Step 1 is only a fast path. Steps 3 and 4, and step 1 again, are made
    /// by the store as part of the insert, against the election as it stands
    /// at that moment.
    pub async fn cast_vote(
        &self,
        user_id: UserId,
        election_id: ElectionId,
        candidate_id: Option<CandidateId>,
        is_vote_no: bool,
    ) -> Result<Vote> {
        if self.store.vote_by(user_id, election_id).await?.is_some() {
            warn!("User {user_id} tried to vote twice in election {election_id}");
            return Err(already_voted(user_id, election_id));
        }

        let choice = BallotChoice::from_parts(candidate_id, is_vote_no).ok_or_else(|| {
            Error::InvalidArgument("Must select either a candidate or vote no".to_string())
        })?;

        match self
            .store
            .insert_vote(VoteCore::new(user_id, election_id, choice))
            .await
        {
            Ok(vote) => {
                info!("Recorded vote {} by user {user_id} in election {election_id}", vote.id);
                Ok(vote)
            }
            Err(Error::Conflict(_)) => {
                warn!("User {user_id} lost a race to vote twice in election {election_id}");
                Err(already_voted(user_id, election_id))
            }
            Err(e) => {
                debug!("Rejected ballot by user {user_id} in election {election_id}: {e}");
                Err(e)
            }
        }
    }

    /// Every ballot a voter has cast, with what each refers to.
    pub async fn find_votes_by_user(&self, user_id: UserId) -> Result<Vec<VoteRecord>> {
        let votes = self.store.votes_by_user(user_id).await?;
        let mut records = Vec::with_capacity(votes.len());
        for vote in votes {
            let election = self.store.election(vote.election_id).await?;
            let candidate = match vote.candidate_id {
                Some(id) => self.store.candidate(id).await?,
                None => None,
            };
            records.push(VoteRecord {
                vote,
                election,
                candidate,
            });
        }
        Ok(records)
    }
}

fn already_voted(user_id: UserId, election_id: ElectionId) -> Error {
    Error::Conflict(format!(
        "User {user_id} has already voted in election {election_id}"
    ))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BallotLedger {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (store, _) = try_outcome!(managed_state(req));
        Outcome::Success(Self::new(store))
    }
}
