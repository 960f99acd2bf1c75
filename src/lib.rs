//! REST backend for a notes application.
//!
//! Notes and users live in a small document store ([`storage::Storage`]),
//! handed to every request handler through axum state. Handler failures are
//! [`error::ApiError`] values whose response conversion carries the
//! error-translation policy; unmatched paths fall through to
//! [`middleware::unknown_endpoint`].

pub mod config;
pub mod error;
pub mod id;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod user_models;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use storage::Storage;

pub struct AppState {
    pub storage: Arc<Storage>,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, bcrypt_cost: u32) -> Self {
        Self {
            storage,
            bcrypt_cost,
        }
    }
}

/// Builds the full application: routes, fallback, request logging and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    routes::router()
        .fallback(middleware::unknown_endpoint)
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
