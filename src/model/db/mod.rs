//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs live in `_id`.
//! - Datetimes are serialised in MongoDB's own format.

pub mod candidate;
pub mod election;
pub mod user;
pub mod vote;
