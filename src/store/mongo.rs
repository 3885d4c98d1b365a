use std::time::Duration;

use log::debug;
use mongodb::{
    bson::{doc, from_document, DateTime as BsonDateTime, Document},
    error::TRANSIENT_TRANSACTION_ERROR,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::{futures::TryStreamExt, tokio::time::sleep};
use serde::Deserialize;

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
    mongodb::{
        ensure_counters_exist, ensure_indexes_exist, is_duplicate_key_error, u32_id_filter, Coll,
        Counter, CounterName,
    },
};

use super::{check_ballot, BallotCount, CascadeReport, Store};

/// A store backed by a MongoDB database.
///
/// Uniqueness is enforced by the indexes created in [`MongoStore::connect`].
/// Multi-document writes run in transactions, so the server must be a replica set.
///
/// A ballot is checked and inserted in one transaction that also bumps
/// `ballot_writes` on the election and candidate it names. Any concurrent write
/// to either document, be it a status change, a roll edit or a delete, then
/// conflicts with the ballot, and one of the two is retried against the other's
/// result.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    users: Coll<User>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    counters: Coll<Counter>,
}

impl MongoStore {
    /// Connect to the given database, making sure its indexes and counters exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        let store = Self::from_db(client, &db);
        ensure_counters_exist(&store.counters).await?;
        Ok(store)
    }

    fn from_db(client: Client, db: &Database) -> Self {
        Self {
            client,
            users: Coll::from_db(db),
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }

    fn by_id() -> FindOptions {
        FindOptions::builder().sort(doc! { "_id": 1 }).build()
    }

    fn return_updated() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    /// Check and insert one ballot in a single transaction.
    async fn try_insert_vote(&self, vote: &Vote) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let ballot = doc! {
            "user_id": vote.user_id,
            "election_id": vote.election_id,
        };
        if self
            .votes
            .find_one_with_session(ballot, None, &mut session)
            .await?
            .is_some()
        {
            session.abort_transaction().await?;
            return Err(already_voted(vote));
        }

        let election = self
            .elections
            .find_one_with_session(u32_id_filter(vote.election_id), None, &mut session)
            .await?;
        let candidate = match vote.candidate_id {
            Some(id) => {
                self.candidates
                    .find_one_with_session(u32_id_filter(id), None, &mut session)
                    .await?
            }
            None => None,
        };
        if let Err(e) = check_ballot(vote, election.as_ref(), candidate.as_ref()) {
            session.abort_transaction().await?;
            return Err(e);
        }

        let touch = doc! {
            "$inc": { "ballot_writes": 1 }
        };
        self.elections
            .update_one_with_session(
                u32_id_filter(vote.election_id),
                touch.clone(),
                None,
                &mut session,
            )
            .await?;
        if let Some(id) = vote.candidate_id {
            self.candidates
                .update_one_with_session(u32_id_filter(id), touch, None, &mut session)
                .await?;
        }

        match self
            .votes
            .insert_one_with_session(vote, None, &mut session)
            .await
        {
            Ok(_) => {}
            // The unique (user_id, election_id) index caught a second ballot.
            Err(e) if is_duplicate_key_error(&e) => return Err(already_voted(vote)),
            Err(e) => return Err(e.into()),
        }

        session.commit_transaction().await?;
        Ok(())
    }
}

/// How many times a transaction is attempted before a write conflict is reported.
const TRANSACTION_ATTEMPTS: u64 = 8;

fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Db(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR))
}

fn already_voted(vote: &Vote) -> Error {
    Error::Conflict(format!(
        "User {} has already voted in election {}",
        vote.user_id, vote.election_id
    ))
}

fn election_patch_doc(patch: &ElectionPatch) -> Document {
    let mut set = Document::new();
    if let Some(title) = &patch.title {
        set.insert("title", title.trim());
    }
    if let Some(start) = patch.start_date {
        set.insert("start_date", BsonDateTime::from_chrono(start));
    }
    if let Some(end) = patch.end_date {
        set.insert("end_date", BsonDateTime::from_chrono(end));
    }
    set
}

fn candidate_patch_doc(patch: &CandidatePatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name.trim());
    }
    if let Some(policy) = &patch.policy {
        set.insert("policy", policy.as_str());
    }
    if let Some(image) = &patch.image {
        set.insert("image", image.as_str());
    }
    set
}

/// One row of the ballot count aggregation.
#[derive(Deserialize)]
struct CountRow {
    #[serde(rename = "_id")]
    key: CountKey,
    count: u64,
}

#[derive(Deserialize)]
struct CountKey {
    #[serde(default)]
    candidate_id: Option<CandidateId>,
    is_vote_no: bool,
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let id = Counter::next(&self.counters, CounterName::Users).await?;
        let user = User { id, user };
        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::Conflict(format!(
                "Username {} is already taken",
                user.username
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.find_one(u32_id_filter(id), None).await?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .find(None, Self::by_id())
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_election(
        &self,
        election: NewElection,
        candidates: Vec<NewCandidate>,
    ) -> Result<(Election, Vec<Candidate>)> {
        let id = Counter::next(&self.counters, CounterName::Elections).await?;
        let election = Election { id, election };
        let mut inserted = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            candidate.election_id = id;
            let id = Counter::next(&self.counters, CounterName::Candidates).await?;
            inserted.push(Candidate { id, candidate });
        }

        // Dropping the session on an error aborts the transaction.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        self.elections
            .insert_one_with_session(&election, None, &mut session)
            .await?;
        if !inserted.is_empty() {
            self.candidates
                .insert_many_with_session(&inserted, None, &mut session)
                .await?;
        }
        session.commit_transaction().await?;

        Ok((election, inserted))
    }

    async fn election(&self, id: ElectionId) -> Result<Option<Election>> {
        Ok(self.elections.find_one(u32_id_filter(id), None).await?)
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        Ok(self
            .elections
            .find(None, Self::by_id())
            .await?
            .try_collect()
            .await?)
    }

    async fn update_election(
        &self,
        id: ElectionId,
        patch: &ElectionPatch,
    ) -> Result<Option<Election>> {
        if patch.is_empty() {
            return self.election(id).await;
        }
        let set = election_patch_doc(patch);
        Ok(self
            .elections
            .find_one_and_update(u32_id_filter(id), doc! { "$set": set }, Self::return_updated())
            .await?)
    }

    async fn set_status(
        &self,
        id: ElectionId,
        status: ElectionStatus,
        required_current: Option<ElectionStatus>,
    ) -> Result<Option<Election>> {
        let mut filter = u32_id_filter(id);
        if let Some(required) = required_current {
            filter.insert("status", required);
        }
        let update = doc! {
            "$set": { "status": status }
        };
        Ok(self
            .elections
            .find_one_and_update(filter, update, Self::return_updated())
            .await?)
    }

    async fn add_eligible_voter(&self, election_id: ElectionId, user_id: UserId) -> Result<bool> {
        let update = doc! {
            "$addToSet": { "eligible_voters": user_id }
        };
        let result = self
            .elections
            .update_one(u32_id_filter(election_id), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn remove_eligible_voter(
        &self,
        election_id: ElectionId,
        user_id: UserId,
    ) -> Result<bool> {
        let update = doc! {
            "$pull": { "eligible_voters": user_id }
        };
        let result = self
            .elections
            .update_one(u32_id_filter(election_id), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_election(&self, id: ElectionId) -> Result<Option<CascadeReport>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .elections
            .delete_one_with_session(u32_id_filter(id), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let filter = doc! { "election_id": id };
        let candidates = self
            .candidates
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?
            .deleted_count;
        let votes = self
            .votes
            .delete_many_with_session(filter, None, &mut session)
            .await?
            .deleted_count;

        session.commit_transaction().await?;
        Ok(Some(CascadeReport { candidates, votes }))
    }

    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut inserted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = Counter::next(&self.counters, CounterName::Candidates).await?;
            inserted.push(Candidate { id, candidate });
        }
        self.candidates.insert_many(&inserted, None).await?;
        Ok(inserted)
    }

    async fn candidate(&self, id: CandidateId) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(u32_id_filter(id), None).await?)
    }

    async fn candidates_for_election(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .find(doc! { "election_id": election_id }, Self::by_id())
            .await?
            .try_collect()
            .await?)
    }

    async fn update_candidate(
        &self,
        id: CandidateId,
        patch: &CandidatePatch,
    ) -> Result<Option<Candidate>> {
        let set = candidate_patch_doc(patch);
        if set.is_empty() {
            return self.candidate(id).await;
        }
        Ok(self
            .candidates
            .find_one_and_update(u32_id_filter(id), doc! { "$set": set }, Self::return_updated())
            .await?)
    }

    async fn delete_candidate(&self, id: CandidateId) -> Result<Option<u64>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .candidates
            .delete_one_with_session(u32_id_filter(id), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let votes = self
            .votes
            .delete_many_with_session(doc! { "candidate_id": id }, None, &mut session)
            .await?
            .deleted_count;

        session.commit_transaction().await?;
        Ok(Some(votes))
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let id = Counter::next(&self.counters, CounterName::Votes).await?;
        let vote = Vote { id, vote };
        let mut attempt = 1;
        loop {
            match self.try_insert_vote(&vote).await {
                Err(e) if is_transient(&e) && attempt < TRANSACTION_ATTEMPTS => {
                    debug!("Retrying ballot {id} (attempt {attempt}): {e}");
                    sleep(Duration::from_millis(10 * attempt)).await;
                    attempt += 1;
                }
                result => return result.map(|()| vote),
            }
        }
    }

    async fn vote_by(&self, user_id: UserId, election_id: ElectionId) -> Result<Option<Vote>> {
        let filter = doc! {
            "user_id": user_id,
            "election_id": election_id,
        };
        Ok(self.votes.find_one(filter, None).await?)
    }

    async fn votes_by_user(&self, user_id: UserId) -> Result<Vec<Vote>> {
        Ok(self
            .votes
            .find(doc! { "user_id": user_id }, Self::by_id())
            .await?
            .try_collect()
            .await?)
    }

    async fn ballot_counts(&self, election_id: ElectionId) -> Result<Vec<BallotCount>> {
        let pipeline = vec![
            doc! {
                "$match": { "election_id": election_id }
            },
            doc! {
                "$group": {
                    "_id": {
                        "candidate_id": "$candidate_id",
                        "is_vote_no": "$is_vote_no",
                    },
                    "count": { "$sum": 1 },
                }
            },
        ];
        let rows: Vec<Document> = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        rows.into_iter()
            .map(|row| {
                let row: CountRow = from_document(row)
                    .map_err(|e| Error::internal(format!("Malformed ballot count: {e}")))?;
                Ok(BallotCount {
                    candidate_id: row.key.candidate_id,
                    is_vote_no: row.key.is_vote_no,
                    count: row.count,
                })
            })
            .collect()
    }
}

/// These need a replica set reachable at `MONGO_TEST_URI`.
#[cfg(test)]
mod tests {
    use std::env;

    use rand::{distributions::Alphanumeric, Rng};

    use crate::store::{conformance, StoreHandle};

    use super::*;

    async fn with_fresh_store<F, Fut>(test: F)
    where
        F: FnOnce(StoreHandle) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        with_fresh_mongo(|store| test(StoreHandle::new(store))).await;
    }

    async fn with_fresh_mongo<F, Fut>(test: F)
    where
        F: FnOnce(MongoStore) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let uri = env::var("MONGO_TEST_URI").expect("MONGO_TEST_URI must be set");
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let db_name = format!("evote_test_{suffix}");

        let store = MongoStore::connect(&uri, &db_name).await.unwrap();
        let client = store.client.clone();
        test(store).await;
        client.database(&db_name).drop(None).await.unwrap();
    }

    #[rocket::async_test]
    #[ignore]
    async fn users() {
        with_fresh_store(conformance::users).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn one_vote_per_voter() {
        with_fresh_store(conformance::one_vote_per_voter).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn counts_and_cascades() {
        with_fresh_store(conformance::counts_and_cascades).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn conditional_status() {
        with_fresh_store(conformance::conditional_status).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn rolls_and_patches() {
        with_fresh_store(conformance::rolls_and_patches).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn election_created_with_candidates() {
        with_fresh_store(conformance::election_created_with_candidates).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn ballots_checked_when_written() {
        with_fresh_store(conformance::ballots_checked_when_written).await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn failed_candidate_insert_leaves_no_election() {
        with_fresh_mongo(|store| async move {
            // Squat on the ID the candidates counter hands out next.
            let squatter = Candidate {
                id: 1,
                candidate: NewCandidate {
                    election_id: 999,
                    name: "Squatter".to_string(),
                    policy: None,
                    image: None,
                },
            };
            store.candidates.insert_one(&squatter, None).await.unwrap();

            let candidate = NewCandidate {
                election_id: 0,
                name: "A".to_string(),
                policy: None,
                image: None,
            };
            let result = store
                .insert_election(NewElection::ongoing_example(), vec![candidate])
                .await;
            assert!(matches!(result, Err(Error::Db(_))));
            assert!(store.elections().await.unwrap().is_empty());
            assert_eq!(store.candidates_for_election(1).await.unwrap(), Vec::new());
        })
        .await;
    }

    #[test]
    #[ignore]
    fn racing_inserts() {
        rocket::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap()
            .block_on(with_fresh_store(conformance::racing_inserts));
    }
}
