use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{common::UserId, db::user::User};

use super::user::Rights;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// The authenticated principal behind a request: who they are and what they may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: UserId,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user, with the rights of their role.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: user.role.into(),
        }
    }

    /// Does this token carry admin rights?
    pub fn is_admin(&self) -> bool {
        self.rights == Rights::Admin
    }

    /// Sign this token into a JWT string that expires after the configured TTL.
    pub fn encode(self, config: &Config) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        let jwt = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(jwt)
    }

    /// Verify and decode a JWT string.
    pub fn decode(jwt: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let jwt = self.encode(config)?;
        let cookie = Cookie::build(AUTH_TOKEN_COOKIE, jwt)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish();
        Ok(cookie)
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw JWT: the cookie wins, then an `Authorization: Bearer` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|jwt| jwt.trim().to_string())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie or bearer header and verify its signature.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::internal("Config is not managed"),
                ))
            }
        };

        let jwt = match raw_token(req) {
            Some(jwt) => jwt,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("No authentication token".to_string()),
                ))
            }
        };

        match Self::decode(&jwt, config) {
            Ok(token) => Outcome::Success(token),
            Err(e) => {
                debug!("Rejected authentication token: {e}");
                Outcome::Failure((Status::Unauthorized, e))
            }
        }
    }
}

/// An [`AuthToken`] that is known to carry admin rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminToken(pub AuthToken);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken>().await);
        if !token.is_admin() {
            return Outcome::Failure((
                Status::Forbidden,
                Error::PermissionDenied(format!(
                    "User {} does not have admin rights",
                    token.id
                )),
            ));
        }
        Outcome::Success(AdminToken(token))
    }
}
