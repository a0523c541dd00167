use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user as returned to callers. The password hash is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub created_at: Option<NaiveDateTime>,
}

/// Login-only view of a user row, including the stored hash.
#[derive(Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub is_admin: bool,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

impl From<UserCredentials> for User {
    fn from(credentials: UserCredentials) -> Self {
        Self {
            id: credentials.id,
            username: credentials.username,
            is_admin: credentials.is_admin,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Updates without a password leave the stored hash alone.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A user holding an explicit grant on a card, with the grant time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct CardAccessUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub created_at: Option<NaiveDateTime>,
}
