use std::io::Cursor;

use rocket::{
    http::{ContentType, Status},
    response::Responder,
    serde::json::serde_json::json,
    Request, Response,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("Invalid ID format")]
    OidParse(#[from] mongodb::bson::oid::Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, message.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", entity.into()))
    }

    /// A state conflict: duplicate vote, closed election, duplicate email.
    /// Always 409, never 400 (the two were used interchangeably upstream).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, message.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Convert the error into a status code plus a JSON body with a
    /// human-readable message. Internal failures are logged but never leak
    /// their details to the client.
    fn respond_to(self, _req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let (status, message) = match self {
            Self::Db(ref err) => {
                error!("Database error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                )
            }
            Self::Argon2(ref err) => {
                error!("Password hashing error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                )
            }
            Self::Csv(ref err) => {
                error!("Export rendering error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                )
            }
            Self::Jwt(_) => (
                Status::Unauthorized,
                "Invalid or expired token".to_string(),
            ),
            Self::OidParse(_) => (Status::BadRequest, "Invalid ID format".to_string()),
            Self::Status(status, message) => (status, message),
        };

        let body = json!({ "error": message }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_statuses() {
        assert!(matches!(
            Error::not_found("Election"),
            Error::Status(s, _) if s == Status::NotFound
        ));
        assert!(matches!(
            Error::conflict("already voted"),
            Error::Status(s, _) if s == Status::Conflict
        ));
        assert!(matches!(
            Error::forbidden("admins only"),
            Error::Status(s, _) if s == Status::Forbidden
        ));
    }

    #[test]
    fn not_found_message() {
        let err = Error::not_found("Candidate");
        assert_eq!(err.to_string(), "Candidate not found");
    }
}
