use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ElectionId, ElectionStatus, UserId},
    mongodb::optional_bson_datetime,
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election title.
    pub title: String,
    /// Lifecycle status.
    pub status: ElectionStatus,
    /// Advertised start time, if any. Informational only.
    #[serde(default, with = "optional_bson_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    /// Advertised end time, if any. Informational only.
    #[serde(default, with = "optional_bson_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    /// The closed roll. Empty means every voter may take part.
    #[serde(default)]
    pub eligible_voters: Vec<UserId>,
}

impl ElectionCore {
    /// Create a new election with an open roll.
    pub fn new(
        title: String,
        status: ElectionStatus,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title,
            status,
            start_date,
            end_date,
            eligible_voters: Vec::new(),
        }
    }

    /// Is this election open to all voters?
    pub fn is_open_roll(&self) -> bool {
        self.eligible_voters.is_empty()
    }

    /// May the given user cast a ballot, as far as the roll is concerned?
    pub fn admits(&self, user_id: UserId) -> bool {
        self.is_open_roll() || self.eligible_voters.contains(&user_id)
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ElectionCore {
        pub fn ongoing_example() -> Self {
            Self::new(
                "Student Council President 2026".to_string(),
                ElectionStatus::Ongoing,
                None,
                None,
            )
        }

        pub fn draft_example() -> Self {
            Self::new(
                "Sports Captain 2026".to_string(),
                ElectionStatus::Draft,
                None,
                None,
            )
        }
    }
}
