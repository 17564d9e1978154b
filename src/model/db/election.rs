use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core election data, as stored in the database.
///
/// The candidate list holds references by ID; the candidate documents
/// themselves live in their own collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub title: String,
    pub description: String,
    /// Whether ballots may currently be cast, changed, or withdrawn.
    pub is_open: bool,
    pub candidates: Vec<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Create a new election, open by default.
    pub fn new(title: String, description: String) -> Self {
        Self {
            title,
            description,
            is_open: true,
            candidates: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Does the given candidate belong to this election?
    pub fn contains(&self, candidate_id: Id) -> bool {
        self.candidates.contains(&candidate_id)
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
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


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let mut election = ElectionCore::example();
        let candidate = Id::new();
        assert!(!election.contains(candidate));

        election.candidates.push(candidate);
        assert!(election.contains(candidate));
        assert!(!election.contains(Id::new()));
    }
}
