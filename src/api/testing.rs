//! Stand-in for the identity provider in tests: a route that hands out a
//! token for any existing user.

use rocket::{http::CookieJar, local::asynchronous::Client, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    common::{Role, UserId},
    db::user::{NewUser, User},
};
use crate::store::StoreHandle;

pub fn routes() -> Vec<Route> {
    routes![login]
}

#[get("/login/<user_id>")]
async fn login(
    user_id: UserId,
    store: StoreHandle,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
) -> Result<()> {
    let user = store
        .user(user_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    cookies.add(AuthToken::new(&user).into_cookie(config)?);
    Ok(())
}

/// Log the client in as the given user, replacing any previous login.
pub async fn login_as(client: &Client, user: &User) {
    let response = client
        .get(format!("/test/login/{}", user.id))
        .dispatch()
        .await;
    assert!(response.status().class().is_success());
}

/// Register an example user with the given role and log the client in as them.
pub async fn register_and_login(client: &Client, store: &StoreHandle, role: Role) -> User {
    let user = match role {
        Role::Admin => NewUser::example_admin(),
        Role::Voter => NewUser::example_voter(1),
    };
    let user = store.insert_user(user).await.unwrap();
    login_as(client, &user).await;
    user
}

/// Register voter `std{n:03}` without logging in.
pub async fn register_voter(store: &StoreHandle, n: u32) -> User {
    store.insert_user(NewUser::example_voter(n)).await.unwrap()
}
