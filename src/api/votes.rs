use log::debug;
use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::logging::RequestId;
use crate::model::api::{
    auth::AuthToken,
    vote::{VoteDescription, VoteHistoryEntry, VoteRequest},
};
use crate::voting::BallotLedger;

pub fn routes() -> Vec<Route> {
    routes![cast_vote, my_votes]
}

/// Cast the caller's ballot.
#[post("/votes", data = "<ballot>", format = "json")]
async fn cast_vote(
    token: AuthToken,
    ballot: Json<VoteRequest>,
    ledger: BallotLedger,
    request_id: &RequestId,
) -> Result<Json<VoteDescription>> {
    let ballot = ballot.0;
    debug!(
        "req{request_id}: user {} voting in election {}",
        token.id, ballot.election_id
    );
    let vote = ledger
        .cast_vote(
            token.id,
            ballot.election_id,
            ballot.candidate_id,
            ballot.is_vote_no,
        )
        .await?;
    Ok(Json(vote.into()))
}

/// The caller's voting history.
#[get("/votes/mine")]
async fn my_votes(token: AuthToken, ledger: BallotLedger) -> Result<Json<Vec<VoteHistoryEntry>>> {
    let history = ledger.find_votes_by_user(token.id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::api::testing::{login_as, register_voter};
    use crate::error::ErrorBody;
    use crate::model::{
        api::election::ElectionSpec,
        common::TransitionPolicy,
        db::user::User,
    };
    use crate::store::StoreHandle;
    use crate::voting::{ElectionRecord, ElectionRegistry, EligibilityOracle};

    use super::*;

    async fn example_election(store: &StoreHandle) -> ElectionRecord {
        ElectionRegistry::new(store.clone(), TransitionPolicy::Permissive)
            .create_election(ElectionSpec::example())
            .await
            .unwrap()
    }

    async fn vote(client: &Client, body: String) -> rocket::local::asynchronous::LocalResponse<'_> {
        client
            .post(uri!(cast_vote))
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await
    }

    #[backend_test(voter)]
    async fn vote_once(client: Client, store: StoreHandle, user: User) {
        let record = example_election(&store).await;
        let election_id = record.election.id;
        let candidate_id = record.candidates[0].id;

        let body = json!({ "electionId": election_id, "candidateId": candidate_id }).to_string();
        let response = vote(&client, body.clone()).await;
        assert_eq!(Status::Ok, response.status());
        let cast: VoteDescription = response.into_json().await.unwrap();
        assert_eq!(cast.user_id, user.id);
        assert_eq!(cast.candidate_id, Some(candidate_id));
        assert!(!cast.is_vote_no);

        // The second attempt conflicts.
        let response = vote(&client, body).await;
        assert_eq!(Status::Conflict, response.status());
        let error: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(error.error, "CONFLICT");

        let stored = store.vote_by(user.id, election_id).await.unwrap().unwrap();
        assert_eq!(stored.id, cast.id);
    }

    #[backend_test(voter)]
    async fn rejected_ballots(client: Client, store: StoreHandle, user: User) {
        let record = example_election(&store).await;
        let election_id = record.election.id;

        // Neither a candidate nor an abstention.
        let response = vote(&client, json!({ "electionId": election_id }).to_string()).await;
        assert_eq!(Status::BadRequest, response.status());

        // Both at once.
        let body = json!({
            "electionId": election_id,
            "candidateId": record.candidates[0].id,
            "isVoteNo": true,
        });
        let response = vote(&client, body.to_string()).await;
        assert_eq!(Status::BadRequest, response.status());

        // No such election.
        let body = json!({ "electionId": election_id + 1, "isVoteNo": true });
        let response = vote(&client, body.to_string()).await;
        assert_eq!(Status::NotFound, response.status());

        // Not on the roll.
        let other = register_voter(&store, 2).await;
        EligibilityOracle::new(store.clone())
            .add_eligible_voter(election_id, other.id)
            .await
            .unwrap();
        let body = json!({ "electionId": election_id, "isVoteNo": true });
        let response = vote(&client, body.to_string()).await;
        assert_eq!(Status::Forbidden, response.status());

        // Closed.
        ElectionRegistry::new(store.clone(), TransitionPolicy::Permissive)
            .set_status(election_id, crate::model::common::ElectionStatus::Completed)
            .await
            .unwrap();
        login_as(&client, &other).await;
        let response = vote(&client, body.to_string()).await;
        assert_eq!(Status::PreconditionFailed, response.status());

        assert!(store.votes_by_user(user.id).await.unwrap().is_empty());
        assert!(store.votes_by_user(other.id).await.unwrap().is_empty());
    }

    #[backend_test(voter)]
    async fn history(client: Client, store: StoreHandle) {
        let first = example_election(&store).await;
        let second = example_election(&store).await;

        let body = json!({
            "electionId": first.election.id,
            "candidateId": first.candidates[1].id,
        });
        vote(&client, body.to_string()).await;
        let body = json!({ "electionId": second.election.id, "isVoteNo": true });
        vote(&client, body.to_string()).await;

        let response = client.get(uri!(my_votes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let history: Vec<VoteHistoryEntry> = response.into_json().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0].candidate.as_ref().map(|c| c.name.as_str()),
            Some("Clara Kindcheek")
        );
        assert_eq!(
            history[0].election.as_ref().map(|e| e.id),
            Some(first.election.id)
        );
        assert!(history[1].vote.is_vote_no);
        assert_eq!(history[1].candidate, None);
    }

    #[backend_test]
    async fn anonymous_cannot_vote(client: Client, store: StoreHandle) {
        let record = example_election(&store).await;
        let body = json!({ "electionId": record.election.id, "isVoteNo": true });
        let response = vote(&client, body.to_string()).await;
        assert_eq!(Status::Unauthorized, response.status());
        assert!(store.ballot_counts(record.election.id).await.unwrap().is_empty());
    }
}
