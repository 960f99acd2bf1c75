//! Error types and their translation into HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The supplied identifier is not a valid object id.
    #[error("Cast to ObjectId failed for value \"{value}\"")]
    Cast { value: String },

    /// A document violates its entity constraints.
    #[error("{0}")]
    Validation(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures a request handler can produce.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("content missing")]
    ContentMissing,

    #[error("user not found")]
    UserNotFound,

    #[error("password must be at least 3 characters long")]
    InvalidPassword,

    /// The request body is not a JSON document of the expected shape.
    #[error("{}", .0.body_text())]
    MalformedBody(#[from] JsonRejection),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status code and client-facing message for this failure.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Store(StoreError::Cast { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid id".to_string())
            }
            ApiError::Store(StoreError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            ApiError::ContentMissing
            | ApiError::UserNotFound
            | ApiError::InvalidPassword
            | ApiError::MalformedBody(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Store(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);

        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
