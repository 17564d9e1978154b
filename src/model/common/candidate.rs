use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the candidate lifecycle.
///
/// Withdrawn candidates are hidden from voters but stay visible to admins,
/// and their vote counts are retained.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Active,
    Withdrawn,
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
