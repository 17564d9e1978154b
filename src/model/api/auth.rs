use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    common::Role,
    db::user::User,
    mongodb::{Coll, Id},
};

/// An authentication token representing a specific user with a specific role.
///
/// Extracting this as a request guard performs authentication: a missing,
/// malformed, or expired bearer token fails with 401. Role checks are a
/// separate, explicit call at the top of admin-only handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthToken {
    pub id: Id,
    pub role: Role,
}

impl AuthToken {
    /// Create a new token for the given user.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }

    /// Reject non-admin callers with a Forbidden error.
    pub fn require_admin(&self) -> Result<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Access denied. Admins only."))
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Sign this token into its wire format.
    pub fn sign(&self, config: &Config) -> String {
        let claims = Claims {
            sub: self.id.to_string(),
            role: self.role,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Verify a token from its wire format, checking signature and expiry.
    pub fn verify(token: &str, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims)?;
        Ok(Self {
            id: claims.sub.parse()?,
            role: claims.role,
        })
    }
}

/// JWT claims: subject ID, role, and expiry.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "rol")]
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the `Authorization` header and check that
    /// the user it references still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let header = match req.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("No token provided"),
                ))
            }
        };
        let token = match header.strip_prefix("Bearer ") {
            Some(token) => token,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Invalid token"),
                ))
            }
        };

        let token = match Self::verify(token, config) {
            Ok(token) => token,
            Err(err) => return Outcome::Failure((Status::Unauthorized, err)),
        };

        // The token outlives any server-side state, so check the user still
        // exists before trusting it.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Invalid token"),
            )),
            Err(err) => Outcome::Failure((Status::InternalServerError, err.into())),
        }
    }
}

/// Registration request: role, name, email, password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "type")]
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request: email/password pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// API-friendly user description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserDetails {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserDetails,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A signed bearer token plus the header carrying it, for tests.
#[cfg(test)]
pub struct BearerToken(pub String);

#[cfg(test)]
impl BearerToken {
    pub fn header(&self) -> rocket::http::Header<'static> {
        rocket::http::Header::new("Authorization", format!("Bearer {}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let config = Config::example();
        let token = AuthToken {
            id: Id::new(),
            role: Role::Admin,
        };

        let signed = token.sign(&config);
        let verified = AuthToken::verify(&signed, &config).unwrap();

        assert_eq!(token.id, verified.id);
        assert_eq!(token.role, verified.role);
    }

    #[test]
    fn tampered_token_rejected() {
        let config = Config::example();
        let token = AuthToken {
            id: Id::new(),
            role: Role::Voter,
        };

        let mut signed = token.sign(&config);
        // Flip a character in the signature segment.
        let tampered = if signed.pop() == Some('A') { 'B' } else { 'A' };
        signed.push(tampered);

        assert!(AuthToken::verify(&signed, &config).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let config = Config::example();
        let other = Config::example_with_secret("a different secret entirely");
        let token = AuthToken {
            id: Id::new(),
            role: Role::Voter,
        };

        let signed = token.sign(&config);
        assert!(AuthToken::verify(&signed, &other).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let config = Config::example();
        let claims = Claims {
            sub: Id::new().to_string(),
            role: Role::Voter,
            // Comfortably beyond the default validation leeway.
            expire_at: Utc::now() - chrono::Duration::seconds(600),
        };
        let signed = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap();

        assert!(AuthToken::verify(&signed, &config).is_err());
    }

    #[test]
    fn non_admin_forbidden() {
        let voter = AuthToken {
            id: Id::new(),
            role: Role::Voter,
        };
        let admin = AuthToken {
            id: Id::new(),
            role: Role::Admin,
        };

        assert!(voter.require_admin().is_err());
        assert!(admin.require_admin().is_ok());
    }
}
