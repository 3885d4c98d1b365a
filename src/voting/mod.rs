//! The vote-casting and tallying core.
//!
//! Each component owns a [`StoreHandle`] given to it at construction and
//! keeps no other state, so any number of them can serve requests side by
//! side. They are also request guards, built from managed state.

use rocket::{http::Status, request::Outcome, Request};

use crate::config::Config;
use crate::error::Error;
use crate::model::db::{candidate::Candidate, election::Election, vote::Vote};
use crate::store::StoreHandle;

mod eligibility;
mod ledger;
mod registry;
mod tally;

pub use eligibility::EligibilityOracle;
pub use ledger::BallotLedger;
pub use registry::ElectionRegistry;
pub use tally::TallyEngine;

/// An election together with its candidates, in candidate order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionRecord {
    pub election: Election,
    pub candidates: Vec<Candidate>,
}

/// A ballot together with the election and candidate it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub vote: Vote,
    pub election: Option<Election>,
    pub candidate: Option<Candidate>,
}

/// Fetch the store and config out of managed state.
fn managed_state<'r>(req: &'r Request<'_>) -> Outcome<(StoreHandle, &'r Config), Error> {
    let rocket = req.rocket();
    match (rocket.state::<StoreHandle>(), rocket.state::<Config>()) {
        (Some(store), Some(config)) => Outcome::Success((store.clone(), config)),
        _ => Outcome::Failure((
            Status::InternalServerError,
            Error::internal("Store or config is not managed"),
        )),
    }
}
