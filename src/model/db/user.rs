use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{common::Role, mongodb::Id};

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl UserCore {
    /// Create a new user, hashing the given password with a random salt.
    pub fn new(
        name: String,
        email: String,
        password: impl AsRef<[u8]>,
        role: Role,
    ) -> Result<Self> {
        let salt: [u8; 16] = rand::random();
        let password_hash =
            argon2::hash_encoded(password.as_ref(), &salt, &argon2::Config::default())?;
        Ok(Self {
            name,
            email,
            password_hash,
            role,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can only fail verification, never panic.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl UserCore {
        pub fn example_admin() -> Self {
            Self::new(
                "Election Admin".to_string(),
                "admin@example.com".to_string(),
                "correct horse battery staple",
                Role::Admin,
            )
            .unwrap()
        }

        pub fn example_voter() -> Self {
            Self::new(
                "Vera Voter".to_string(),
                "vera@example.com".to_string(),
                "hunter2hunter2",
                Role::Voter,
            )
            .unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = UserCore::new(
            "Test".to_string(),
            "test@example.com".to_string(),
            "swordfish",
            Role::Voter,
        )
        .unwrap();

        assert!(user.verify_password("swordfish"));
        assert!(!user.verify_password("swordfish "));
        assert!(!user.verify_password(""));
    }

    #[test]
    fn hashes_are_salted() {
        let first = UserCore::new(
            "Test".to_string(),
            "test@example.com".to_string(),
            "swordfish",
            Role::Voter,
        )
        .unwrap();
        let second = UserCore::new(
            "Test".to_string(),
            "test@example.com".to_string(),
            "swordfish",
            Role::Voter,
        )
        .unwrap();

        assert_ne!(first.password_hash, second.password_hash);
    }

    #[test]
    fn malformed_hash_fails_closed() {
        let user = UserCore {
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "not-an-argon2-hash".to_string(),
            role: Role::Voter,
        };
        assert!(!user.verify_password("anything"));
    }
}
