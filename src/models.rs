use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::id::ObjectId;
use crate::user_models::UserSummary;

const CONTENT_REQUIRED: &str = "Note validation failed: content: Path `content` is required.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: ObjectId,
    pub content: String,
    pub important: bool,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ObjectId>,
}

impl Note {
    pub fn apply(&mut self, update: NoteUpdate) {
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(important) = update.important {
            self.important = important;
        }
    }
}

/// A validated note that has not been stored yet. The creation date is
/// stamped here and never taken from the client.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub content: String,
    pub important: bool,
    pub date: DateTime<Utc>,
    pub user: Option<ObjectId>,
}

impl NewNote {
    pub fn new(
        content: String,
        important: Option<bool>,
        user: Option<ObjectId>,
    ) -> StoreResult<Self> {
        validate_content(&content)?;

        Ok(Self {
            content,
            important: important.unwrap_or(false),
            date: Utc::now(),
            user,
        })
    }

    pub fn into_note(self, id: ObjectId) -> Note {
        Note {
            id,
            content: self.content,
            important: self.important,
            date: self.date,
            user: self.user,
        }
    }
}

/// Fields an update may touch. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub important: Option<bool>,
}

impl NoteUpdate {
    pub fn new(content: Option<String>, important: Option<bool>) -> StoreResult<Self> {
        if let Some(ref content) = content {
            validate_content(content)?;
        }
        Ok(Self { content, important })
    }
}

fn validate_content(content: &str) -> StoreResult<()> {
    if content.trim().is_empty() {
        return Err(StoreError::Validation(CONTENT_REQUIRED.to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub content: Option<String>,
    pub important: Option<bool>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    pub content: Option<String>,
    pub important: Option<bool>,
}

/// Owner reference of a listed note: resolved to the user's public fields,
/// or left as the raw id when the user no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteOwner {
    Resolved(UserSummary),
    Dangling(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedNote {
    pub id: ObjectId,
    pub content: String,
    pub important: bool,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NoteOwner>,
}

impl PopulatedNote {
    pub fn new(note: Note, owner: Option<NoteOwner>) -> Self {
        Self {
            id: note.id,
            content: note.content,
            important: note.important,
            date: note.date,
            user: owner,
        }
    }
}
