//! API-friendly types: request bodies and response descriptions.
//!
//! Everything here is camelCase on the wire.

pub mod auth;
pub mod candidate;
pub mod election;
pub mod eligibility;
pub mod stats;
pub mod user;
pub mod vote;
