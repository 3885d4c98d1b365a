use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, UserId};

/// Whether a particular voter may take part in a particular election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub election_id: ElectionId,
    pub user_id: UserId,
    pub eligible: bool,
}
