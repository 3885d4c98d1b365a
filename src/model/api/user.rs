use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{Role, UserId},
    db::user::{NewUser, User},
};

/// A new user, as registered by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    pub username: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub user_type: Option<String>,
}

fn default_role() -> Role {
    Role::Voter
}

impl UserSpec {
    pub fn validate(&self) -> Result<()> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(Error::InvalidArgument(
                "Username must not be empty".to_string(),
            ));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(Error::InvalidArgument(format!(
                "Username '{username}' must not contain whitespace"
            )));
        }
        Ok(())
    }
}

impl From<UserSpec> for NewUser {
    fn from(spec: UserSpec) -> Self {
        Self {
            username: spec.username.trim().to_string(),
            role: spec.role,
            user_type: spec.user_type,
        }
    }
}

/// An API-friendly user description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub user_type: Option<String>,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.user.username,
            role: user.user.role,
            user_type: user.user.user_type,
        }
    }
}
