//! The identity boundary.
//!
//! Users authenticate with an external identity provider, which hands them a
//! signed token naming their user ID and rights. We verify the signature and
//! trust what it says.

mod token;
mod user;

pub use token::{AdminToken, AuthToken, AUTH_TOKEN_COOKIE};
pub use user::Rights;
