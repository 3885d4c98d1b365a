use std::collections::{BTreeMap, HashMap, HashSet};

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidatePatch, election::ElectionPatch},
    common::{CandidateId, ElectionId, ElectionStatus, UserId, VoteId},
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
};

use super::{check_ballot, BallotCount, CascadeReport, Store};

/// An in-process store.
///
/// All tables sit behind a single lock, so every operation is atomic with
/// respect to every other. In particular the checks in [`Store::insert_vote`]
/// see the same election, candidate and roll that the insert commits against.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    elections: BTreeMap<ElectionId, Election>,
    candidates: BTreeMap<CandidateId, Candidate>,
    votes: BTreeMap<VoteId, Vote>,
    usernames: HashSet<String>,
    ballot_index: HashMap<(UserId, ElectionId), VoteId>,
    next_user: u32,
    next_election: u32,
    next_candidate: u32,
    next_vote: u32,
}

/// Hand out the next ID from a sequence. IDs start at 1.
fn allocate(sequence: &mut u32) -> u32 {
    *sequence += 1;
    *sequence
}

impl Tables {
    /// Remove the given votes, keeping the ballot index in step.
    fn remove_votes(&mut self, doomed: impl Fn(&Vote) -> bool) -> u64 {
        let ids: Vec<VoteId> = self
            .votes
            .values()
            .filter(|vote| doomed(vote))
            .map(|vote| vote.id)
            .collect();
        for id in &ids {
            if let Some(vote) = self.votes.remove(id) {
                self.ballot_index.remove(&(vote.user_id, vote.election_id));
            }
        }
        ids.len() as u64
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if !tables.usernames.insert(user.username.clone()) {
            return Err(Error::Conflict(format!(
                "Username {} is already taken",
                user.username
            )));
        }
        let id = allocate(&mut tables.next_user);
        let user = User { id, user };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn insert_election(
        &self,
        election: NewElection,
        candidates: Vec<NewCandidate>,
    ) -> Result<(Election, Vec<Candidate>)> {
        let mut tables = self.tables.lock().await;
        let id = allocate(&mut tables.next_election);
        let election = Election { id, election };
        tables.elections.insert(id, election.clone());
        let candidates = candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.election_id = id;
                let id = allocate(&mut tables.next_candidate);
                let candidate = Candidate { id, candidate };
                tables.candidates.insert(id, candidate.clone());
                candidate
            })
            .collect();
        Ok((election, candidates))
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self.tables.lock().await.elections.get(&id).cloned())
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        Ok(self.tables.lock().await.elections.values().cloned().collect())
    }

    async fn update_election(
        &self,
        id: ElectionId,
        patch: &ElectionPatch,
    ) -> Result<Option<Election>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.elections.get_mut(&id).map(|election| {
            patch.apply(election);
            election.clone()
        }))
    }

    async fn set_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        required_current: Option<ElectionStatus>,
    ) -> Result<Option<Election>> {
        let mut tables = self.tables.lock().await;
        let election = match tables.elections.get_mut(&id) {
            Some(election) => election,
            None => return Ok(None),
        };
        if required_current.map_or(false, |required| election.status != required) {
            return Ok(None);
        }
        election.status = status;
        Ok(Some(election.clone()))
    }

    async fn add_eligible_voter(&self, election_id: ElectionId, user_id: UserId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.elections.get_mut(&election_id) {
            Some(election) => {
                if !election.eligible_voters.contains(&user_id) {
                    election.eligible_voters.push(user_id);
                }
                true
            }
            None => false,
        })
    }

    async fn remove_eligible_voter(
        &self,
        election_id: ElectionId,
        user_id: UserId,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.elections.get_mut(&election_id) {
            Some(election) => {
                election.eligible_voters.retain(|id| *id != user_id);
                true
            }
            None => false,
        })
    }

    async fn delete_election(&self, id: ElectionId) -> Result<Option<CascadeReport>> {
        let mut tables = self.tables.lock().await;
        if tables.elections.remove(&id).is_none() {
            return Ok(None);
        }
        let votes = tables.remove_votes(|vote| vote.election_id == id);
        let before = tables.candidates.len();
        tables
            .candidates
            .retain(|_, candidate| candidate.election_id != id);
        let candidates = (before - tables.candidates.len()) as u64;
        Ok(Some(CascadeReport { candidates, votes }))
    }

    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>> {
        let mut tables = self.tables.lock().await;
        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let id = allocate(&mut tables.next_candidate);
                let candidate = Candidate { id, candidate };
                tables.candidates.insert(id, candidate.clone());
                candidate
            })
            .collect())
    }

    async fn candidate(&self, id: CandidateId) -> Result<Option<Candidate>> {
        Ok(self.tables.lock().await.candidates.get(&id).cloned())
    }

    async fn candidates_for_election(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .values()
            .filter(|candidate| candidate.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn update_candidate(
        &self,
        id: CandidateId,
        patch: &CandidatePatch,
    ) -> Result<Option<Candidate>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.candidates.get_mut(&id).map(|candidate| {
            patch.apply(candidate);
            candidate.clone()
        }))
    }

    async fn delete_candidate(&self, id: CandidateId) -> Result<Option<u64>> {
        let mut tables = self.tables.lock().await;
        if tables.candidates.remove(&id).is_none() {
            return Ok(None);
        }
        Ok(Some(tables.remove_votes(|vote| vote.candidate_id == Some(id))))
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        let key = (vote.user_id, vote.election_id);
        if tables.ballot_index.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "User {} has already voted in election {}",
                vote.user_id, vote.election_id
            )));
        }
        check_ballot(
            &vote,
            tables.elections.get(&vote.election_id),
            vote.candidate_id.and_then(|id| tables.candidates.get(&id)),
        )?;
        let id = allocate(&mut tables.next_vote);
        let vote = Vote { id, vote };
        tables.ballot_index.insert(key, id);
        tables.votes.insert(id, vote.clone());
        Ok(vote)
    }

    async fn vote_by(&self, user_id: UserId, election_id: ElectionId) -> Result<Option<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ballot_index
            .get(&(user_id, election_id))
            .and_then(|id| tables.votes.get(id))
            .cloned())
    }

    async fn votes_by_user(&self, user_id: UserId) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .values()
            .filter(|vote| vote.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ballot_counts(&self, election_id: ElectionId) -> Result<Vec<BallotCount>> {
        let tables = self.tables.lock().await;
        let mut groups: BTreeMap<(Option<CandidateId>, bool), u64> = BTreeMap::new();
        for vote in tables
            .votes
            .values()
            .filter(|vote| vote.election_id == election_id)
        {
            *groups
                .entry((vote.candidate_id, vote.is_vote_no))
                .or_default() += 1;
        }
        Ok(groups
            .into_iter()
            .map(|((candidate_id, is_vote_no), count)| BallotCount {
                candidate_id,
                is_vote_no,
                count,
            })
            .collect())
    }
}
