use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use notes_service::{
    app,
    id::ObjectId,
    models::{NewNote, Note},
    storage::Storage,
    user_models::{NewUser, User},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const INITIAL_NOTES: [&str; 2] = ["HTML is easy", "Browser can only execute JavaScript"];

struct TestApp {
    router: Router,
    storage: Arc<Storage>,
}

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }
}

impl TestApp {
    async fn new() -> Self {
        let storage = Arc::new(Storage::in_memory());
        for (i, content) in INITIAL_NOTES.iter().enumerate() {
            let note = NewNote::new(content.to_string(), Some(i == 1), None).unwrap();
            storage.insert_note(note).await.unwrap();
        }

        let state = Arc::new(AppState::new(storage.clone(), 4));
        Self {
            router: app(state),
            storage,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => {
                let raw = body.to_string();
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, raw.len())
                    .body(Body::from(raw))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    async fn notes_in_db(&self) -> Vec<Note> {
        self.storage.find_notes().await
    }

    async fn contents_in_db(&self) -> Vec<String> {
        self.notes_in_db().await.into_iter().map(|n| n.content).collect()
    }

    async fn users_in_db(&self) -> Vec<User> {
        self.storage.find_users().await
    }

    async fn add_user(&self, username: &str) -> User {
        let hash = bcrypt::hash("secret", 4).unwrap();
        let user = NewUser::new(username.to_string(), None, hash).unwrap();
        self.storage.insert_user(user).await.unwrap()
    }
}

fn non_existing_id() -> String {
    ObjectId::new().to_hex()
}

// when there are initially some notes saved

#[tokio::test]
async fn notes_are_returned_as_json() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/notes", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.unwrap().contains("application/json"));
}

#[tokio::test]
async fn all_notes_are_returned() {
    let app = TestApp::new().await;
    let body = app.request(Method::GET, "/api/notes", None).await.json();

    assert_eq!(body.as_array().unwrap().len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn a_specific_note_is_within_the_returned_notes() {
    let app = TestApp::new().await;
    let body = app.request(Method::GET, "/api/notes", None).await.json();

    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["content"].as_str().unwrap())
        .collect();
    assert!(contents.contains(&"Browser can only execute JavaScript"));
}

// viewing a specific note

#[tokio::test]
async fn view_succeeds_with_a_valid_id() {
    let app = TestApp::new().await;
    let note_to_view = app.notes_in_db().await.remove(0);

    let response = app
        .request(Method::GET, &format!("/api/notes/{}", note_to_view.id), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.as_deref().unwrap().contains("application/json"));
    assert_eq!(response.json(), serde_json::to_value(&note_to_view).unwrap());
}

#[tokio::test]
async fn view_fails_with_404_if_note_does_not_exist() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, &format!("/api/notes/{}", non_existing_id()), None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn view_fails_with_400_if_id_is_invalid() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/notes/5a3d5da59070081a82a3445", None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "error": "invalid id" }));
}

// adding a new note

#[tokio::test]
async fn add_succeeds_with_valid_data() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({
                "content": "async/await simplifies making async calls",
                "important": true
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.as_deref().unwrap().contains("application/json"));
    let saved = response.json();
    assert_eq!(saved["important"], true);
    assert!(saved["date"].is_string());

    let contents = app.contents_in_db().await;
    assert_eq!(contents.len(), INITIAL_NOTES.len() + 1);
    assert!(contents.contains(&"async/await simplifies making async calls".to_string()));
}

#[tokio::test]
async fn important_defaults_to_false() {
    let app = TestApp::new().await;
    let saved = app
        .request(Method::POST, "/api/notes", Some(json!({ "content": "plain" })))
        .await
        .json();

    assert_eq!(saved["important"], false);
}

#[tokio::test]
async fn client_supplied_date_is_ignored() {
    let app = TestApp::new().await;
    let saved = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "dated", "date": "1999-01-01T00:00:00Z" })),
        )
        .await
        .json();

    assert_ne!(saved["date"], "1999-01-01T00:00:00Z");
}

#[tokio::test]
async fn add_fails_with_400_if_content_is_missing() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/notes", Some(json!({ "important": true })))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "error": "content missing" }));
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn add_fails_with_400_if_content_is_empty() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/notes", Some(json!({ "content": "" })))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let error = response.json()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Note validation failed"));
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn add_succeeds_with_a_large_note() {
    let app = TestApp::new().await;
    let content = "x".repeat(1024 * 1024 + 10);

    let response = app
        .request(Method::POST, "/api/notes", Some(json!({ "content": content })))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len() + 1);
}

#[tokio::test]
async fn add_without_json_content_type_is_a_structured_400() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/notes")
        .body(Body::from(r#"{"content":"untyped"}"#))
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("Content-Type"));
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn add_with_mistyped_field_is_a_structured_400() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "typed badly", "important": "yes" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.content_type.as_deref().unwrap().contains("application/json"));
    assert!(response.json()["error"].is_string());
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn malformed_json_on_update_is_a_structured_400() {
    let app = TestApp::new().await;
    let note = app.notes_in_db().await.remove(0);
    let raw = "{not json";
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/notes/{}", note.id))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, raw.len())
        .body(Body::from(raw))
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
    assert_eq!(app.notes_in_db().await.remove(0), note);
}

// updating a note

#[tokio::test]
async fn update_changes_content_and_importance_only() {
    let app = TestApp::new().await;
    let original = app.notes_in_db().await.remove(0);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/notes/{}", original.id),
            Some(json!({ "content": "HTML is hard", "important": true })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let updated: Note = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.content, "HTML is hard");
    assert!(updated.important);
    assert_eq!(updated.date, original.date);
}

#[tokio::test]
async fn update_fails_with_404_if_note_does_not_exist() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/notes/{}", non_existing_id()),
            Some(json!({ "content": "nowhere", "important": false })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_fails_with_400_if_id_is_invalid() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::PUT,
            "/api/notes/123",
            Some(json!({ "content": "bad id", "important": false })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "error": "invalid id" }));
}

// deletion of a note

#[tokio::test]
async fn delete_succeeds_with_204_if_id_is_valid() {
    let app = TestApp::new().await;
    let note_to_delete = app.notes_in_db().await.remove(0);
    let uri = format!("/api/notes/{}", note_to_delete.id);

    let response = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_empty());

    let contents = app.contents_in_db().await;
    assert_eq!(contents.len(), INITIAL_NOTES.len() - 1);
    assert!(!contents.contains(&note_to_delete.content));

    let again = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(again.status, StatusCode::NO_CONTENT);
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len() - 1);
}

#[tokio::test]
async fn delete_fails_with_400_if_id_is_invalid() {
    let app = TestApp::new().await;
    let response = app.request(Method::DELETE, "/api/notes/xyz", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn unknown_endpoint_returns_404() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/nothing-here", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), json!({ "error": "unknown endpoint" }));
}

#[tokio::test]
async fn unsupported_method_on_known_path_is_unknown_endpoint() {
    let app = TestApp::new().await;
    let note = app.notes_in_db().await.remove(0);

    let response = app
        .request(Method::PATCH, &format!("/api/notes/{}", note.id), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), json!({ "error": "unknown endpoint" }));

    for uri in ["/api/notes", "/api/users"] {
        let response = app.request(Method::DELETE, uri, None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json(), json!({ "error": "unknown endpoint" }));
    }
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

// where there is initially one user in db

#[tokio::test]
async fn user_creation_succeeds_with_a_fresh_username() {
    let app = TestApp::new().await;
    app.add_user("admin").await;
    let users_at_start = app.users_in_db().await;

    let response = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({
                "username": "goodboy",
                "name": "George Papagapitos",
                "password": "password"
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.as_deref().unwrap().contains("application/json"));
    let body = response.json();
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password").is_none());

    let users_at_end = app.users_in_db().await;
    assert_eq!(users_at_end.len(), users_at_start.len() + 1);
    assert!(users_at_end.iter().any(|u| u.username == "goodboy"));
    let created = users_at_end.iter().find(|u| u.username == "goodboy").unwrap();
    assert!(bcrypt::verify("password", &created.password_hash).unwrap());
}

#[tokio::test]
async fn user_creation_fails_if_username_is_taken() {
    let app = TestApp::new().await;
    app.add_user("admin").await;

    let response = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({ "username": "admin", "password": "salainen" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("unique"));
    assert_eq!(app.users_in_db().await.len(), 1);
}

#[tokio::test]
async fn user_creation_fails_with_short_password() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/users",
            Some(json!({ "username": "shorty", "password": "pw" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.users_in_db().await.is_empty());
}

#[tokio::test]
async fn note_created_for_user_is_linked_both_ways() {
    let app = TestApp::new().await;
    let user = app.add_user("admin").await;

    let saved = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "owned note", "userId": user.id.to_hex() })),
        )
        .await
        .json();
    assert_eq!(saved["user"], user.id.to_hex());

    let user = app.users_in_db().await.remove(0);
    assert_eq!(user.notes.len(), 1);
    assert_eq!(user.notes[0].to_hex(), saved["id"].as_str().unwrap());

    let listed = app.request(Method::GET, "/api/notes", None).await.json();
    let owned = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["content"] == "owned note")
        .unwrap();
    assert_eq!(owned["user"]["username"], "admin");

    let users = app.request(Method::GET, "/api/users", None).await.json();
    assert_eq!(users[0]["notes"][0]["content"], "owned note");
}

#[tokio::test]
async fn note_for_unknown_user_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "orphan", "userId": non_existing_id() })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "error": "user not found" }));
    assert_eq!(app.notes_in_db().await.len(), INITIAL_NOTES.len());
}

#[tokio::test]
async fn deleting_owned_note_unlinks_it_from_user() {
    let app = TestApp::new().await;
    let user = app.add_user("admin").await;

    let saved = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "short lived", "userId": user.id.to_hex() })),
        )
        .await
        .json();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/notes/{}", saved["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let user = app.users_in_db().await.remove(0);
    assert!(user.notes.is_empty());
}

#[tokio::test]
async fn end_to_end_scenario() {
    let app = TestApp::new().await;

    let listed = app.request(Method::GET, "/api/notes", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json().as_array().unwrap().len(), 2);

    let created = app
        .request(
            Method::POST,
            "/api/notes",
            Some(json!({
                "content": "async/await simplifies making async calls",
                "important": true
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);

    let listed = app.request(Method::GET, "/api/notes", None).await.json();
    let notes = listed.as_array().unwrap();
    assert_eq!(notes.len(), 3);
    assert!(notes
        .iter()
        .any(|n| n["content"] == "async/await simplifies making async calls"));

    let first_id = notes
        .iter()
        .find(|n| n["content"] == "HTML is easy")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let deleted = app
        .request(Method::DELETE, &format!("/api/notes/{}", first_id), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let listed = app.request(Method::GET, "/api/notes", None).await.json();
    let notes = listed.as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert!(!notes.iter().any(|n| n["content"] == "HTML is easy"));
}
