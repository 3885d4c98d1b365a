use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AdminToken, AuthToken},
        eligibility::Eligibility,
        user::UserDescription,
    },
    common::{ElectionId, UserId},
};
use crate::voting::EligibilityOracle;

pub fn routes() -> Vec<Route> {
    routes![
        list_eligible_voters,
        add_eligible_voter,
        remove_eligible_voter,
        my_eligibility
    ]
}

#[get("/elections/<election_id>/voters")]
async fn list_eligible_voters(
    _token: AdminToken,
    election_id: ElectionId,
    oracle: EligibilityOracle,
) -> Result<Json<Vec<UserDescription>>> {
    let voters = oracle.list_eligible_voters(election_id).await?;
    Ok(Json(voters.into_iter().map(Into::into).collect()))
}

#[put("/elections/<election_id>/voters/<user_id>")]
async fn add_eligible_voter(
    _token: AdminToken,
    election_id: ElectionId,
    user_id: UserId,
    oracle: EligibilityOracle,
) -> Result<()> {
    oracle.add_eligible_voter(election_id, user_id).await
}

#[delete("/elections/<election_id>/voters/<user_id>")]
async fn remove_eligible_voter(
    _token: AdminToken,
    election_id: ElectionId,
    user_id: UserId,
    oracle: EligibilityOracle,
) -> Result<()> {
    oracle.remove_eligible_voter(election_id, user_id).await
}

/// May the caller vote in this election?
#[get("/elections/<election_id>/eligibility")]
async fn my_eligibility(
    token: AuthToken,
    election_id: ElectionId,
    oracle: EligibilityOracle,
) -> Result<Json<Eligibility>> {
    let eligible = oracle.is_eligible(election_id, token.id).await?;
    Ok(Json(Eligibility {
        election_id,
        user_id: token.id,
        eligible,
    }))
}
