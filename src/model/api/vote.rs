use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDetails, election::ElectionSummary},
    db::vote::BallotCore,
};

/// Cast a ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRequest {
    pub candidate_id: String,
    pub election_id: String,
}

/// Move an existing ballot to a different candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub new_candidate_id: String,
    pub election_id: String,
}

/// Withdraw an existing ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub election_id: String,
}

/// An API-friendly ballot description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDetails {
    pub voter_id: String,
    pub candidate_id: String,
    pub election_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&BallotCore> for BallotDetails {
    fn from(ballot: &BallotCore) -> Self {
        Self {
            voter_id: ballot.voter_id.to_string(),
            candidate_id: ballot.candidate_id.to_string(),
            election_id: ballot.election_id.to_string(),
            timestamp: ballot.cast_at,
        }
    }
}

/// Response to a successful cast or change.
#[derive(Debug, Serialize, Deserialize)]
pub struct CastResponse {
    pub message: String,
    pub candidate: CandidateDetails,
    pub vote: BallotDetails,
}

/// Ballot status for one election.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<BallotDetails>,
}

/// One of the caller's ballots, joined with its candidate and election.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteHistoryEntry {
    pub vote: BallotDetails,
    pub candidate: CandidateDetails,
    pub election: ElectionSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteHistory {
    pub message: String,
    pub votes: Vec<VoteHistoryEntry>,
}
