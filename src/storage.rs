use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::id::ObjectId;
use crate::models::{NewNote, Note, NoteOwner, NoteUpdate, PopulatedNote};
use crate::user_models::{NewUser, NoteSummary, User, UserResponse};

/// Where the document store keeps its collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Parses a connection string: `memory:` (or empty) keeps everything in
    /// memory, `file:<path>` or a bare path persists to a JSON file.
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if url.is_empty() || url == "memory:" || url == "memory" {
            return StoreLocation::Memory;
        }
        let path = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);
        StoreLocation::File(PathBuf::from(path))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    users: Vec<User>,
}

pub struct Storage {
    location: StoreLocation,
    data: RwLock<Collections>,
}

impl Storage {
    pub fn open(location: StoreLocation) -> StoreResult<Self> {
        let data = match &location {
            StoreLocation::File(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            _ => Collections::default(),
        };

        tracing::debug!(
            ?location,
            notes = data.notes.len(),
            users = data.users.len(),
            "store opened"
        );

        Ok(Self {
            location,
            data: RwLock::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            data: RwLock::new(Collections::default()),
        }
    }

    pub async fn find_notes(&self) -> Vec<Note> {
        self.data.read().await.notes.clone()
    }

    /// All notes with their `user` reference resolved to the owner's public
    /// fields.
    pub async fn find_notes_populated(&self) -> Vec<PopulatedNote> {
        let data = self.data.read().await;
        data.notes
            .iter()
            .cloned()
            .map(|note| {
                let owner = note.user.map(|user_id| {
                    match data.users.iter().find(|u| u.id == user_id) {
                        Some(user) => NoteOwner::Resolved(user.summary()),
                        None => NoteOwner::Dangling(user_id),
                    }
                });
                PopulatedNote::new(note, owner)
            })
            .collect()
    }

    pub async fn find_note_by_id(&self, id: &str) -> StoreResult<Option<Note>> {
        let id: ObjectId = id.parse()?;
        let data = self.data.read().await;
        Ok(data.notes.iter().find(|n| n.id == id).cloned())
    }

    pub async fn insert_note(&self, note: NewNote) -> StoreResult<Note> {
        let mut data = self.data.write().await;
        let note = note.into_note(ObjectId::new());

        let mut staged = data.clone();
        staged.notes.push(note.clone());
        self.commit(&mut data, staged).await?;
        Ok(note)
    }

    /// Applies `update` and returns the post-update document, or `None` when
    /// no note has this id.
    pub async fn update_note_by_id(
        &self,
        id: &str,
        update: NoteUpdate,
    ) -> StoreResult<Option<Note>> {
        let id: ObjectId = id.parse()?;
        let mut data = self.data.write().await;

        let Some(pos) = data.notes.iter().position(|n| n.id == id) else {
            return Ok(None);
        };

        let mut staged = data.clone();
        staged.notes[pos].apply(update);
        let updated = staged.notes[pos].clone();

        self.commit(&mut data, staged).await?;
        Ok(Some(updated))
    }

    /// Removes a note and drops its id from the owner's note list. Returns
    /// the removed note, if there was one.
    pub async fn delete_note_by_id(&self, id: &str) -> StoreResult<Option<Note>> {
        let id: ObjectId = id.parse()?;
        let mut data = self.data.write().await;

        let Some(pos) = data.notes.iter().position(|n| n.id == id) else {
            return Ok(None);
        };

        let mut staged = data.clone();
        let removed = staged.notes.remove(pos);
        if let Some(owner) = removed.user {
            if let Some(user) = staged.users.iter_mut().find(|u| u.id == owner) {
                user.notes.retain(|n| *n != id);
            }
        }

        self.commit(&mut data, staged).await?;
        Ok(Some(removed))
    }

    pub async fn find_users(&self) -> Vec<User> {
        self.data.read().await.users.clone()
    }

    /// All users with their note references resolved. References to notes
    /// that no longer exist are skipped.
    pub async fn find_users_populated(&self) -> Vec<UserResponse<NoteSummary>> {
        let data = self.data.read().await;
        data.users
            .iter()
            .map(|user| UserResponse {
                id: user.id,
                username: user.username.clone(),
                name: user.name.clone(),
                notes: user
                    .notes
                    .iter()
                    .filter_map(|note_id| data.notes.iter().find(|n| n.id == *note_id))
                    .map(|n| NoteSummary {
                        id: n.id,
                        content: n.content.clone(),
                        important: n.important,
                        date: n.date,
                    })
                    .collect(),
            })
            .collect()
    }

    pub async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let id: ObjectId = id.parse()?;
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    pub async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut data = self.data.write().await;

        if data.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Validation(
                "User validation failed: username: expected `username` to be unique".to_string(),
            ));
        }

        let user = user.into_user(ObjectId::new());
        let mut staged = data.clone();
        staged.users.push(user.clone());
        self.commit(&mut data, staged).await?;
        Ok(user)
    }

    /// Appends a note reference to a user's note list and persists the user.
    pub async fn append_note_to_user(
        &self,
        user_id: ObjectId,
        note_id: ObjectId,
    ) -> StoreResult<Option<User>> {
        let mut data = self.data.write().await;

        let Some(pos) = data.users.iter().position(|u| u.id == user_id) else {
            return Ok(None);
        };

        let mut staged = data.clone();
        staged.users[pos].notes.push(note_id);
        let updated = staged.users[pos].clone();

        self.commit(&mut data, staged).await?;
        Ok(Some(updated))
    }

    /// Persists `staged` and only then makes it the visible state. A failed
    /// write leaves `current` untouched.
    async fn commit(
        &self,
        current: &mut RwLockWriteGuard<'_, Collections>,
        staged: Collections,
    ) -> StoreResult<()> {
        if let StoreLocation::File(path) = &self.location {
            save_to_disk(path, &staged).await?;
        }
        **current = staged;
        Ok(())
    }
}

/// Writes the collections to a sibling temp file and renames it over `path`,
/// so a crash mid-write never leaves a truncated store behind.
async fn save_to_disk(path: &Path, data: &Collections) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(data)?;
    let tmp = temp_path(path);

    tokio::fs::write(&tmp, json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
