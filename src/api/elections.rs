use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AdminToken, AuthToken},
        election::{ElectionDescription, ElectionPatch, ElectionSpec, ElectionSummary, StatusChange},
    },
    common::ElectionId,
};
use crate::store::CascadeReport;
use crate::voting::ElectionRegistry;

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        get_election,
        create_election,
        update_election,
        set_status,
        delete_election
    ]
}

#[get("/elections")]
async fn list_elections(
    _token: AuthToken,
    registry: ElectionRegistry,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = registry.list_elections().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>")]
async fn get_election(
    _token: AuthToken,
    election_id: ElectionId,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(registry.get_election(election_id).await?.into()))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AdminToken,
    spec: Json<ElectionSpec>,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(registry.create_election(spec.0).await?.into()))
}

#[patch("/elections/<election_id>", data = "<patch>", format = "json")]
async fn update_election(
    _token: AdminToken,
    election_id: ElectionId,
    patch: Json<ElectionPatch>,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(
        registry.update_election(election_id, patch.0).await?.into(),
    ))
}

#[patch("/elections/<election_id>/status", data = "<change>", format = "json")]
async fn set_status(
    _token: AdminToken,
    election_id: ElectionId,
    change: Json<StatusChange>,
    registry: ElectionRegistry,
) -> Result<Json<ElectionSummary>> {
    Ok(Json(
        registry
            .set_status(election_id, change.status)
            .await?
            .into(),
    ))
}

#[delete("/elections/<election_id>")]
async fn delete_election(
    _token: AdminToken,
    election_id: ElectionId,
    registry: ElectionRegistry,
) -> Result<Json<CascadeReport>> {
    Ok(Json(registry.delete_election(election_id).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use crate::api::testing::{login_as, register_voter};
    use crate::model::{common::ElectionStatus, db::user::User};
    use crate::store::StoreHandle;

    use super::*;

    async fn create(client: &Client, spec: &ElectionSpec) -> ElectionDescription {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .json(spec)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    #[backend_test(admin)]
    async fn create_and_fetch(client: Client, store: StoreHandle) {
        let created = create(&client, &ElectionSpec::example()).await;
        assert_eq!(created.title, "Student Council President 2026");
        assert_eq!(created.status, ElectionStatus::Ongoing);
        assert_eq!(created.candidates.len(), 2);

        // It is in the store.
        let stored = store.election(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, created.title);

        // Any principal may read it.
        let voter = register_voter(&store, 1).await;
        login_as(&client, &voter).await;
        let response = client
            .get(uri!(get_election(created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let fetched: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);

        let response = client.get(uri!(list_elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[backend_test(admin)]
    async fn bad_specs(client: Client, store: StoreHandle) {
        let mut spec = ElectionSpec::example();
        spec.title = String::new();
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .json(&spec)
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert!(store.elections().await.unwrap().is_empty());

        let response = client.get(uri!(get_election(99))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn voters_cannot_administer(client: Client, user: User) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .json(&ElectionSpec::example())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.delete(uri!(delete_election(1))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(user.username, "std001");
    }

    #[backend_test(admin)]
    async fn patch_and_status(client: Client) {
        let created = create(&client, &ElectionSpec::draft_example()).await;
        assert_eq!(created.status, ElectionStatus::Draft);

        let response = client
            .patch(uri!(update_election(created.id)))
            .header(ContentType::JSON)
            .body(json!({ "title": "Sports Captain 2027" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let patched: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(patched.title, "Sports Captain 2027");
        assert_eq!(patched.candidates, created.candidates);

        let response = client
            .patch(uri!(set_status(created.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "ONGOING" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let summary: ElectionSummary = response.into_json().await.unwrap();
        assert_eq!(summary.status, ElectionStatus::Ongoing);

        // Permissive by default: even backwards moves are allowed.
        let response = client
            .patch(uri!(set_status(created.id)))
            .header(ContentType::JSON)
            .body(json!({ "status": "DRAFT" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(admin)]
    async fn delete_reports_cascade(client: Client, store: StoreHandle) {
        let created = create(&client, &ElectionSpec::example()).await;

        let response = client
            .delete(uri!(delete_election(created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let report: CascadeReport = response.into_json().await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.votes, 0);
        assert!(store.election(created.id).await.unwrap().is_none());

        let response = client
            .delete(uri!(delete_election(created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
