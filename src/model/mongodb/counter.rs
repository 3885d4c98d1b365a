use log::debug;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{is_duplicate_key_error, Coll};

/// The auto-increment sequences we keep.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CounterName {
    Users,
    Elections,
    Candidates,
    Votes,
}

impl CounterName {
    pub const ALL: [CounterName; 4] = [Self::Users, Self::Elections, Self::Candidates, Self::Votes];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Elections => "elections",
            Self::Candidates => "candidates",
            Self::Votes => "votes",
        }
    }
}

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` for the given sequence, starting at the given value.
    pub fn new(name: CounterName, start: u32) -> Self {
        Self {
            id: name.as_str().to_string(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, name: CounterName) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": name.as_str() }, update, options)
            .await?
            .ok_or_else(|| Error::internal(format!("Missing counter '{}'", name.as_str())))?;
        Ok(counter.next)
    }
}

/// Ensure that every auto-increment counter exists, starting at 1.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    for name in CounterName::ALL {
        let existing = counters.find_one(doc! { "_id": name.as_str() }, None).await?;
        if existing.is_some() {
            continue;
        }
        // Another instance may win the race to create it; that's fine.
        match counters.insert_one(Counter::new(name, 1), None).await {
            Ok(_) => debug!("Created counter '{}'", name.as_str()),
            Err(e) if is_duplicate_key_error(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
