use std::fmt::{self, Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Different privilege levels.
///
/// The role is fixed at registration and embedded in auth tokens; a token's
/// role claim is trusted for the token's lifetime.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Role {
    Voter,
    Admin,
}

impl Role {
    /// Does this role carry administrator rights?
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Voter => "Voter",
                Self::Admin => "Admin",
            }
        )
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}
