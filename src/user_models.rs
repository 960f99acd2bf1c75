use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::id::ObjectId;

const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub notes: Vec<ObjectId>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

/// A validated user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(username: String, name: Option<String>, password_hash: String) -> StoreResult<Self> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(StoreError::Validation(
                "User validation failed: username: Path `username` is required.".to_string(),
            ));
        }
        if trimmed.chars().count() < MIN_USERNAME_LEN {
            return Err(StoreError::Validation(format!(
                "User validation failed: username: Path `username` (`{}`) is shorter \
                 than the minimum allowed length ({}).",
                trimmed, MIN_USERNAME_LEN
            )));
        }

        Ok(Self {
            username: trimmed.to_string(),
            name,
            password_hash,
        })
    }

    pub fn into_user(self, id: ObjectId) -> User {
        User {
            id,
            username: self.username,
            name: self.name,
            password_hash: self.password_hash,
            notes: Vec::new(),
        }
    }
}

/// Public fields of a user, used when a note's owner is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Note fields shown when a user's note list is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: ObjectId,
    pub content: String,
    pub important: bool,
    pub date: DateTime<Utc>,
}

/// External representation of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse<N> {
    pub id: ObjectId,
    pub username: String,
    pub name: Option<String>,
    pub notes: Vec<N>,
}

impl From<User> for UserResponse<ObjectId> {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            notes: user.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}
