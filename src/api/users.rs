use log::info;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AdminToken,
        user::{UserDescription, UserSpec},
    },
    common::UserId,
    db::user::NewUser,
};
use crate::store::StoreHandle;

pub fn routes() -> Vec<Route> {
    routes![create_user, get_users, get_user]
}

#[post("/users", data = "<spec>", format = "json")]
async fn create_user(
    _token: AdminToken,
    spec: Json<UserSpec>,
    store: StoreHandle,
) -> Result<Json<UserDescription>> {
    spec.validate()?;
    let user = store.insert_user(NewUser::from(spec.0)).await?;
    info!("Registered {:?} user {} '{}'", user.role, user.id, user.username);
    Ok(Json(user.into()))
}

#[get("/users")]
async fn get_users(_token: AdminToken, store: StoreHandle) -> Result<Json<Vec<UserDescription>>> {
    let users = store.users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[get("/users/<user_id>")]
async fn get_user(
    _token: AdminToken,
    user_id: UserId,
    store: StoreHandle,
) -> Result<Json<UserDescription>> {
    let user = store
        .user(user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    Ok(Json(user.into()))
}
