use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::{feedback::Feedback, user::User};

/// A feedback submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub message: String,
}

/// An API-friendly feedback description, joined with its submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetails {
    pub id: String,
    pub user: FeedbackUser,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// The submitter of a feedback entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackUser {
    pub name: String,
    pub email: String,
}

impl FeedbackDetails {
    /// Join a feedback entry with its submitter, if they still exist.
    pub fn new(feedback: Feedback, user: Option<&User>) -> Self {
        Self {
            id: feedback.id.to_string(),
            user: user
                .map(|user| FeedbackUser {
                    name: user.name.clone(),
                    email: user.email.clone(),
                })
                .unwrap_or_else(|| FeedbackUser {
                    name: "deleted user".to_string(),
                    email: String::new(),
                }),
            message: feedback.feedback.message,
            created_at: feedback.feedback.created_at,
        }
    }
}
