use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId};

/// A point-in-time tally of one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionStats {
    pub election_id: ElectionId,
    pub election_title: String,
    /// Every ballot recorded, abstentions included.
    pub total_votes: u64,
    /// Ballots recorded as "vote no".
    pub vote_no_count: u64,
    /// One entry per candidate, in candidate order.
    pub candidate_stats: Vec<CandidateStats>,
}

/// One candidate's share of an election tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStats {
    pub id: CandidateId,
    pub name: String,
    pub votes: u64,
    /// Share of `total_votes`, in the range 0 to 100. Zero when nobody has voted.
    pub percentage: f64,
}

/// `count` as a percentage of `total`, defined as zero for an empty tally.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

impl ElectionStats {
    /// Render the tally as a CSV report.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        // Writing to a `String` cannot fail.
        let _ = writeln!(csv, "Election,{}", csv_field(&self.election_title));
        let _ = writeln!(csv, "Candidate,Votes,Percentage");
        for candidate in &self.candidate_stats {
            let _ = writeln!(
                csv,
                "{},{},{:.2}",
                csv_field(&candidate.name),
                candidate.votes,
                candidate.percentage
            );
        }
        let _ = writeln!(
            csv,
            "Vote No,{},{:.2}",
            self.vote_no_count,
            percentage(self.vote_no_count, self.total_votes)
        );
        let _ = writeln!(csv, "Total,{},", self.total_votes);
        csv
    }
}

/// Quote a CSV field if it contains anything that would break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> ElectionStats {
        ElectionStats {
            election_id: 1,
            election_title: "Council, 2026".to_string(),
            total_votes: 4,
            vote_no_count: 1,
            candidate_stats: vec![
                CandidateStats {
                    id: 1,
                    name: "Polaris \"Star\" Brightheart".to_string(),
                    votes: 2,
                    percentage: 50.0,
                },
                CandidateStats {
                    id: 2,
                    name: "Clara Kindcheek".to_string(),
                    votes: 1,
                    percentage: 25.0,
                },
            ],
        }
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn csv_report() {
        let expected = "Election,\"Council, 2026\"\n\
                        Candidate,Votes,Percentage\n\
                        \"Polaris \"\"Star\"\" Brightheart\",2,50.00\n\
                        Clara Kindcheek,1,25.00\n\
                        Vote No,1,25.00\n\
                        Total,4,\n";
        assert_eq!(example().to_csv(), expected);
    }

    #[test]
    fn wire_format() {
        let json = rocket::serde::json::serde_json::to_value(example()).unwrap();
        assert_eq!(json["totalVotes"], 4);
        assert_eq!(json["voteNoCount"], 1);
        assert_eq!(json["candidateStats"][0]["percentage"], 50.0);
    }
}
