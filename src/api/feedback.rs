use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            feedback::{FeedbackDetails, FeedbackRequest},
        },
        db::{
            feedback::{Feedback, FeedbackCore, NewFeedback, MAX_MESSAGE_LENGTH},
            user::User,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![submit_feedback, get_feedback, delete_feedback]
}

#[post("/feedback", data = "<request>", format = "json")]
async fn submit_feedback(
    token: AuthToken,
    request: Json<FeedbackRequest>,
    users: Coll<User>,
    new_feedback: Coll<NewFeedback>,
    feedback: Coll<Feedback>,
) -> Result<(Status, Json<FeedbackResponse>)> {
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(Error::bad_request("Feedback message is required"));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(Error::bad_request(format!(
            "Feedback message must be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }

    let entry = FeedbackCore::new(token.id, message);
    let new_id: Id = new_feedback
        .insert_one(&entry, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the database.
        .into();

    let entry = feedback.find_one(new_id.as_doc(), None).await?.unwrap();
    let user = users.find_one(token.id.as_doc(), None).await?;

    Ok((
        Status::Created,
        Json(FeedbackResponse {
            message: "Feedback submitted successfully".to_string(),
            feedback: FeedbackDetails::new(entry, user.as_ref()),
        }),
    ))
}

#[get("/feedback")]
async fn get_feedback(
    token: AuthToken,
    users: Coll<User>,
    feedback: Coll<Feedback>,
) -> Result<Json<FeedbackListResponse>> {
    token.require_admin()?;

    let entries: Vec<Feedback> = feedback.find(None, None).await?.try_collect().await?;

    // Join with the submitters in a single query.
    let user_ids: Vec<Id> = entries.iter().map(|entry| entry.user_id).collect();
    let with_ids = doc! {
        "_id": {
            "$in": user_ids,
        }
    };
    let submitters: HashMap<Id, User> = users
        .find(with_ids, None)
        .await?
        .map_ok(|user| (user.id, user))
        .try_collect()
        .await?;

    let feedbacks: Vec<FeedbackDetails> = entries
        .into_iter()
        .map(|entry| {
            let user = submitters.get(&entry.user_id);
            FeedbackDetails::new(entry, user)
        })
        .collect();

    Ok(Json(FeedbackListResponse {
        count: feedbacks.len(),
        feedbacks,
    }))
}

#[delete("/feedback/<id>")]
async fn delete_feedback(
    token: AuthToken,
    id: String,
    feedback: Coll<Feedback>,
) -> Result<Json<DeleteResponse>> {
    token.require_admin()?;

    let feedback_id: Id = id.parse()?;
    let result = feedback.delete_one(feedback_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Feedback {feedback_id}")));
    }

    Ok(Json(DeleteResponse {
        message: "Feedback deleted".to_string(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub message: String,
    pub feedback: FeedbackDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackListResponse {
    pub count: usize,
    pub feedbacks: Vec<FeedbackDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}
