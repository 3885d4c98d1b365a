//! Types shared between the database and API representations.

mod role;
mod status;

pub use role::Role;
pub use status::{ElectionStatus, TransitionPolicy};

/// Our user IDs are integers.
pub type UserId = u32;
/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers, unique across all elections.
pub type CandidateId = u32;
/// Our vote IDs are integers.
pub type VoteId = u32;
