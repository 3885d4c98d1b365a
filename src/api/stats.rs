use rocket::{http::Header, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{auth::AuthToken, stats::ElectionStats},
    common::ElectionId,
};
use crate::voting::TallyEngine;

pub fn routes() -> Vec<Route> {
    routes![election_stats, export_stats]
}

/// A CSV download.
#[derive(Responder)]
#[response(content_type = "text/csv")]
struct CsvReport {
    body: String,
    disposition: Header<'static>,
}

impl CsvReport {
    fn new(body: String, filename: String) -> Self {
        Self {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename={filename}"),
            ),
        }
    }
}

#[get("/stats/<election_id>")]
async fn election_stats(
    _token: AuthToken,
    election_id: ElectionId,
    tally: TallyEngine,
) -> Result<Json<ElectionStats>> {
    Ok(Json(tally.compute_stats(election_id).await?))
}

#[get("/stats/<election_id>/export")]
async fn export_stats(
    _token: AuthToken,
    election_id: ElectionId,
    tally: TallyEngine,
) -> Result<CsvReport> {
    let csv = tally.export_csv(election_id).await?;
    Ok(CsvReport::new(
        csv,
        format!("election-{election_id}-results.csv"),
    ))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
    };

    use crate::model::{api::election::ElectionSpec, common::TransitionPolicy};
    use crate::store::StoreHandle;
    use crate::voting::{BallotLedger, ElectionRegistry};

    use super::*;

    #[backend_test(voter)]
    async fn live_tally(client: Client, store: StoreHandle) {
        let record = ElectionRegistry::new(store.clone(), TransitionPolicy::Permissive)
            .create_election(ElectionSpec::example())
            .await
            .unwrap();
        let id = record.election.id;
        let ledger = BallotLedger::new(store.clone());
        ledger
            .cast_vote(100, id, Some(record.candidates[0].id), false)
            .await
            .unwrap();
        ledger.cast_vote(101, id, None, true).await.unwrap();

        let response = client.get(uri!(election_stats(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let stats: ElectionStats = response.into_json().await.unwrap();
        assert_eq!(stats.total_votes, 2);
        assert_eq!(stats.vote_no_count, 1);
        assert_eq!(stats.candidate_stats[0].votes, 1);
        assert_eq!(stats.candidate_stats[0].percentage, 50.0);
        assert_eq!(stats.candidate_stats[1].percentage, 0.0);

        let response = client.get(uri!(export_stats(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.content_type(), Some(ContentType::CSV));
        assert_eq!(
            response.headers().get_one("Content-Disposition"),
            Some(format!("attachment; filename=election-{id}-results.csv").as_str())
        );
        let csv = response.into_string().await.unwrap();
        assert!(csv.starts_with("Election,Student Council President 2026\n"));
        assert!(csv.ends_with("Total,2,\n"));
    }

    #[backend_test(voter)]
    async fn unknown_election(client: Client) {
        let response = client.get(uri!(election_stats(7))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.get(uri!(export_stats(7))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
