//! HTTP routes, one file per collection.

use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub mod notes;
pub mod users;

pub fn router() -> Router<Arc<AppState>> {
    notes::router().merge(users::router())
}
