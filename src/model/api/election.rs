use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::election::Election;

/// Specification of a new election, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Open or close an election.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub election_id: String,
    pub is_open: bool,
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_open: bool,
    pub candidates: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionDetails {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.to_string(),
            title: election.election.title,
            description: election.election.description,
            is_open: election.election.is_open,
            candidates: election
                .election
                .candidates
                .iter()
                .map(ToString::to_string)
                .collect(),
            created_at: election.election.created_at,
        }
    }
}

/// A summary of an election, shorter than the full `ElectionDetails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_open: bool,
}

impl From<&Election> for ElectionSummary {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id.to_string(),
            title: election.title.clone(),
            description: election.description.clone(),
            is_open: election.is_open,
        }
    }
}
