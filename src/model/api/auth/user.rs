use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::common::Role;

/// Different privilege levels, as carried in an authentication token.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl From<Role> for Rights {
    fn from(role: Role) -> Self {
        match role {
            Role::Voter => Self::Voter,
            Role::Admin => Self::Admin,
        }
    }
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}
