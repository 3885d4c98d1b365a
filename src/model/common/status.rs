use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Under construction; ballots are not accepted.
    Draft,
    /// Open for voting.
    Ongoing,
    /// Closed; results are final.
    Completed,
}

impl ElectionStatus {
    /// Is `next` one step forward along `DRAFT -> ONGOING -> COMPLETED`?
    /// Staying put counts as a valid step.
    pub fn advances_to(self, next: ElectionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Draft)
                | (Self::Draft, Self::Ongoing)
                | (Self::Ongoing, Self::Ongoing)
                | (Self::Ongoing, Self::Completed)
                | (Self::Completed, Self::Completed)
        )
    }

    /// The only state a strict transition into `next` may start from,
    /// or `None` if `next` cannot be reached except by staying put.
    pub fn strict_predecessor(next: ElectionStatus) -> Option<ElectionStatus> {
        match next {
            Self::Draft => None,
            Self::Ongoing => Some(Self::Draft),
            Self::Completed => Some(Self::Ongoing),
        }
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "DRAFT",
            Self::Ongoing => "ONGOING",
            Self::Completed => "COMPLETED",
        })
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// How `SetStatus` treats the requested transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be set from any status (manual admin override).
    #[default]
    Permissive,
    /// Only forward moves along `DRAFT -> ONGOING -> COMPLETED`.
    Strict,
}
