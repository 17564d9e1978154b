use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{common::CandidateStatus, db::candidate::Candidate};

/// Specification of a new candidate, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub manifesto: String,
    pub photo_url: Option<String>,
    pub election_id: String,
}

/// Partial update of a candidate; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub manifesto: Option<String>,
    pub photo_url: Option<String>,
    pub status: Option<CandidateStatus>,
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetails {
    pub id: String,
    pub name: String,
    pub position: String,
    pub manifesto: String,
    pub photo_url: Option<String>,
    pub status: CandidateStatus,
    pub vote_count: i64,
    pub election_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDetails {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.to_string(),
            name: candidate.candidate.name,
            position: candidate.candidate.position,
            manifesto: candidate.candidate.manifesto,
            photo_url: candidate.candidate.photo_url,
            status: candidate.candidate.status,
            vote_count: candidate.candidate.vote_count,
            election_id: candidate.candidate.election_id.to_string(),
            created_at: candidate.candidate.created_at,
        }
    }
}
