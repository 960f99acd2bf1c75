use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiError;
use crate::id::ObjectId;
use crate::middleware::unknown_endpoint;
use crate::user_models::{CreateUserRequest, NewUser, NoteSummary, UserResponse};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 3;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/users",
        get(list_users)
            .post(create_user)
            .fallback(unknown_endpoint),
    )
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserResponse<NoteSummary>>> {
    Json(state.storage.find_users_populated().await)
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse<ObjectId>>, ApiError> {
    let Json(payload) = payload?;
    let password = payload
        .password
        .filter(|p| p.chars().count() >= MIN_PASSWORD_LEN)
        .ok_or(ApiError::InvalidPassword)?;

    let cost = state.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")?;

    let user = NewUser::new(payload.username.unwrap_or_default(), payload.name, password_hash)?;
    let saved_user = state.storage.insert_user(user).await?;

    tracing::info!(username = %saved_user.username, "user created");
    Ok(Json(saved_user.into()))
}
