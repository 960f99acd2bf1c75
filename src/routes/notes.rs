use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::error::ApiError;
use crate::middleware::unknown_endpoint;
use crate::models::{
    CreateNoteRequest, NewNote, Note, NoteUpdate, PopulatedNote, UpdateNoteRequest,
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notes",
            get(list_notes).post(create_note).fallback(unknown_endpoint),
        )
        .route(
            "/api/notes/:id",
            get(get_note)
                .put(update_note)
                .delete(delete_note)
                .fallback(unknown_endpoint),
        )
}

async fn list_notes(State(state): State<Arc<AppState>>) -> Json<Vec<PopulatedNote>> {
    Json(state.storage.find_notes_populated().await)
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.storage.find_note_by_id(&id).await? {
        Some(note) => Ok(Json(note).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(payload) = payload?;
    let content = payload.content.ok_or(ApiError::ContentMissing)?;

    let owner = match payload.user_id {
        Some(ref user_id) => Some(
            state
                .storage
                .find_user_by_id(user_id)
                .await?
                .ok_or(ApiError::UserNotFound)?,
        ),
        None => None,
    };

    let note = NewNote::new(content, payload.important, owner.as_ref().map(|u| u.id))?;
    let saved_note = state.storage.insert_note(note).await?;

    // Not atomic with the insert above: a failure here leaves the note
    // stored without a back-reference on the user.
    if let Some(owner) = owner {
        state
            .storage
            .append_note_to_user(owner.id, saved_note.id)
            .await?;
    }

    tracing::debug!(id = %saved_note.id, "note created");
    Ok(Json(saved_note))
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let update = NoteUpdate::new(payload.content, payload.important)?;

    match state.storage.update_note_by_id(&id, update).await? {
        Some(note) => Ok(Json(note).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Some(removed) = state.storage.delete_note_by_id(&id).await? {
        tracing::debug!(id = %removed.id, "note deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
