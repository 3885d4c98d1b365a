use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::candidate::CandidateSpec,
    common::ElectionStatus,
    db::election::NewElection,
};

/// A new election, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Initial status; elections open for voting straight away unless told otherwise.
    #[serde(default)]
    pub status: Option<ElectionStatus>,
    /// Candidates to create alongside the election, in display order.
    #[serde(default)]
    pub candidates: Vec<CandidateSpec>,
}

impl ElectionSpec {
    /// Check the election details are well-formed.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_dates(self.start_date, self.end_date)?;
        for candidate in &self.candidates {
            candidate.validate()?;
        }
        Ok(())
    }
}

impl From<ElectionSpec> for NewElection {
    fn from(spec: ElectionSpec) -> Self {
        NewElection::new(
            spec.title.trim().to_string(),
            spec.status.unwrap_or(ElectionStatus::Ongoing),
            spec.start_date,
            spec.end_date,
        )
    }
}

/// A partial update of an election's metadata. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl ElectionPatch {
    /// Does this patch change nothing?
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }

    /// Check the patch is well-formed on its own.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_dates(self.start_date, self.end_date)
    }

    /// Apply this patch to an election in memory.
    pub fn apply(&self, election: &mut NewElection) {
        if let Some(title) = &self.title {
            election.title = title.trim().to_string();
        }
        if let Some(start) = self.start_date {
            election.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            election.end_date = Some(end);
        }
    }
}

/// Body of a status change request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ElectionStatus,
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "Election title must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Check that the end does not come before the start.
pub(crate) fn validate_dates(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::InvalidArgument(format!(
                "Election cannot end ({end}) before it starts ({start})"
            )));
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn defaults_to_ongoing() {
        let election: NewElection = ElectionSpec::example().into();
        assert_eq!(election.status, ElectionStatus::Ongoing);
        assert!(election.is_open_roll());

        let election: NewElection = ElectionSpec::draft_example().into();
        assert_eq!(election.status, ElectionStatus::Draft);
    }

    #[test]
    fn rejects_bad_specs() {
        let mut spec = ElectionSpec::example();
        spec.title = "   ".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidArgument(_))));

        let mut spec = ElectionSpec::example();
        let now = Utc::now();
        spec.start_date = Some(now);
        spec.end_date = Some(now - Duration::hours(1));
        assert!(matches!(spec.validate(), Err(Error::InvalidArgument(_))));

        let mut spec = ElectionSpec::example();
        spec.candidates[0].name = String::new();
        assert!(matches!(spec.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn patch_leaves_absent_fields() {
        let mut election: NewElection = ElectionSpec::example().into();
        let patch = ElectionPatch {
            title: Some(" Renamed ".to_string()),
            ..Default::default()
        };
        patch.apply(&mut election);
        assert_eq!(election.title, "Renamed");
        assert_eq!(election.status, ElectionStatus::Ongoing);
        assert!(ElectionPatch::default().is_empty());
    }
}
