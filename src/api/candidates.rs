use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AdminToken, AuthToken},
        candidate::{CandidateDescription, CandidatePatch, CandidateSpec},
    },
    common::{CandidateId, ElectionId},
};
use crate::store::CascadeReport;
use crate::voting::ElectionRegistry;

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        get_candidate,
        add_candidate,
        update_candidate,
        delete_candidate
    ]
}

#[get("/elections/<election_id>/candidates")]
async fn list_candidates(
    _token: AuthToken,
    election_id: ElectionId,
    registry: ElectionRegistry,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry.list_candidates(election_id).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(
    _token: AuthToken,
    candidate_id: CandidateId,
    registry: ElectionRegistry,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(registry.get_candidate(candidate_id).await?.into()))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    _token: AdminToken,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    registry: ElectionRegistry,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(
        registry.add_candidate(election_id, spec.0).await?.into(),
    ))
}

#[patch("/candidates/<candidate_id>", data = "<patch>", format = "json")]
async fn update_candidate(
    _token: AdminToken,
    candidate_id: CandidateId,
    patch: Json<CandidatePatch>,
    registry: ElectionRegistry,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(
        registry
            .update_candidate(candidate_id, patch.0)
            .await?
            .into(),
    ))
}

/// Delete a candidate. The ballots cast for them go too.
#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AdminToken,
    candidate_id: CandidateId,
    registry: ElectionRegistry,
) -> Result<Json<CascadeReport>> {
    let votes = registry.delete_candidate(candidate_id).await?;
    Ok(Json(CascadeReport {
        candidates: 1,
        votes,
    }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };

    use crate::model::{
        api::election::ElectionSpec,
        common::TransitionPolicy,
        db::vote::{BallotChoice, VoteCore},
    };
    use crate::store::StoreHandle;

    use super::*;

    async fn example_election(store: &StoreHandle) -> ElectionId {
        ElectionRegistry::new(store.clone(), TransitionPolicy::Permissive)
            .create_election(ElectionSpec::example())
            .await
            .unwrap()
            .election
            .id
    }

    #[backend_test(admin)]
    async fn candidate_lifecycle(client: Client, store: StoreHandle) {
        let election_id = example_election(&store).await;

        // Add.
        let spec = CandidateSpec {
            name: "Orion Steadfast".to_string(),
            policy: Some("A bigger sports budget".to_string()),
            image: None,
        };
        let response = client
            .post(uri!(add_candidate(election_id)))
            .header(ContentType::JSON)
            .json(&spec)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let added: CandidateDescription = response.into_json().await.unwrap();
        assert_eq!(added.election_id, election_id);
        assert_eq!(added.name, "Orion Steadfast");

        // List.
        let response = client
            .get(uri!(list_candidates(election_id)))
            .dispatch()
            .await;
        let listed: Vec<CandidateDescription> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2], added);

        // Update.
        let patch = CandidatePatch {
            image: Some("/images/orion.png".to_string()),
            ..Default::default()
        };
        let response = client
            .patch(uri!(update_candidate(added.id)))
            .header(ContentType::JSON)
            .json(&patch)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: CandidateDescription = response.into_json().await.unwrap();
        assert_eq!(updated.image.as_deref(), Some("/images/orion.png"));
        assert_eq!(updated.name, added.name);

        // Delete, taking a ballot with it.
        store
            .insert_vote(VoteCore::new(50, election_id, BallotChoice::Candidate(added.id)))
            .await
            .unwrap();
        let response = client
            .delete(uri!(delete_candidate(added.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let report: CascadeReport = response.into_json().await.unwrap();
        assert_eq!(report.votes, 1);

        let response = client.get(uri!(get_candidate(added.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidate_errors(client: Client, store: StoreHandle) {
        let election_id = example_election(&store).await;

        let response = client
            .post(uri!(add_candidate(election_id + 1)))
            .header(ContentType::JSON)
            .json(&CandidateSpec::example1())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let patch = CandidatePatch {
            name: Some(String::new()),
            ..Default::default()
        };
        let response = client
            .patch(uri!(update_candidate(1)))
            .header(ContentType::JSON)
            .json(&patch)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .get(uri!(list_candidates(election_id + 1)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
