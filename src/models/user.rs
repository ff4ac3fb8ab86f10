use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user mirrored from the identity provider. `id` is the provider's subject id.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub image: String,
}

/// Mutable fields applied by `clerk/user.updated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub email: String,
    pub name: String,
    pub image: String,
}

impl From<User> for UserChanges {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
            image: user.image,
        }
    }
}
