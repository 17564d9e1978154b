use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::CandidateStatus, mongodb::Id};

/// Core candidate data, as stored in the database.
///
/// `vote_count` is a denormalised counter; it must always equal the number
/// of ballots referencing this candidate. Only the vote handlers mutate it,
/// and only inside a transaction together with the ballot write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub position: String,
    pub manifesto: String,
    pub photo_url: Option<String>,
    pub status: CandidateStatus,
    pub vote_count: i64,
    /// Foreign key election ID.
    pub election_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl CandidateCore {
    /// Create a new active candidate with no votes.
    pub fn new(
        name: String,
        position: String,
        manifesto: String,
        photo_url: Option<String>,
        election_id: Id,
    ) -> Self {
        Self {
            name,
            position,
            manifesto,
            photo_url,
            status: CandidateStatus::Active,
            vote_count: 0,
            election_id,
            created_at: Utc::now(),
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
