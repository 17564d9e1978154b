use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Maximum accepted feedback message length, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Core feedback data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCore {
    /// Foreign key user ID of the submitter.
    pub user_id: Id,
    pub message: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl FeedbackCore {
    /// Create a new feedback entry, timestamped now.
    pub fn new(user_id: Id, message: String) -> Self {
        Self {
            user_id,
            message,
            created_at: Utc::now(),
        }
    }
}

/// A feedback entry without an ID.
pub type NewFeedback = FeedbackCore;

/// A feedback entry from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub feedback: FeedbackCore,
}

impl Deref for Feedback {
    type Target = FeedbackCore;

    fn deref(&self) -> &Self::Target {
        &self.feedback
    }
}

impl DerefMut for Feedback {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.feedback
    }
}
