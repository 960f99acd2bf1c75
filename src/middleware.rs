use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Bodies up to this size are buffered and logged; larger or unsized bodies
/// are forwarded untouched.
const MAX_LOGGED_BODY: usize = 64 * 1024;

/// Logs method, path and body of every request, then hands it on. Never
/// answers the request itself.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let declared_len = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let body = match declared_len {
        Some(len) if len <= MAX_LOGGED_BODY => match to_bytes(body, MAX_LOGGED_BODY).await {
            Ok(bytes) => {
                log_request(&parts, &String::from_utf8_lossy(&bytes));
                Body::from(bytes)
            }
            Err(e) => {
                tracing::error!("failed to read request body: {}", e);
                log_request(&parts, "<unreadable>");
                Body::empty()
            }
        },
        _ => {
            log_request(&parts, "<body omitted>");
            body
        }
    };

    next.run(Request::from_parts(parts, body)).await
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    tracing::info!(
        method = %parts.method,
        path = %parts.uri.path(),
        body = %body,
        "request"
    );
}

pub async fn unknown_endpoint() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "unknown endpoint" })),
    )
}
