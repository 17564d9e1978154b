use serde::{Deserialize, Serialize};

use crate::model::{api::candidate::CandidateDetails, db::candidate::Candidate};

/// Orderings a caller can request for tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    /// Vote count descending (the default).
    Vote,
    /// Candidate name ascending.
    Name,
    /// Creation time descending.
    Latest,
}

impl Default for SortMethod {
    fn default() -> Self {
        Self::Vote
    }
}

/// Formats a tally can be exported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ExportType {
    Json,
    Csv,
    Pdf,
}

impl Default for ExportType {
    fn default() -> Self {
        Self::Json
    }
}

/// A sorted tally for one election.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub election_id: String,
    pub method: SortMethod,
    pub results: Vec<CandidateDetails>,
}

/// Turnout statistics for one election.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoutStats {
    pub election_id: String,
    pub eligible_voters: u64,
    pub total_votes_cast: u64,
    pub turnout_percentage: f64,
}

/// The winning candidate of one election.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSummary {
    pub candidate_id: String,
    pub name: String,
    pub vote_count: i64,
}

impl From<&Candidate> for WinnerSummary {
    fn from(candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.id.to_string(),
            name: candidate.name.clone(),
            vote_count: candidate.vote_count,
        }
    }
}

/// Per-election winner summary for the history view.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub election_id: String,
    pub title: String,
    pub description: String,
    pub winner: Option<WinnerSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub results: Vec<HistoryEntry>,
}
