//! Shared harness for the API tests: an in-memory server instance plus
//! request helpers that drive the router directly.
#![allow(dead_code)] // not every test binary uses every helper

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use townsquare::auth::AuthTokens;
use townsquare::build_router;
use townsquare::db::Database;
use townsquare::email::Mailer;
use townsquare::state::{AppState, ServerConfig};
use townsquare::upload::UploadStore;
use townsquare::users::Role;

/// Build an in-memory app. The MX check is disabled so registration works
/// offline; the mailer is the logging mock.
pub fn setup() -> (Router, AppState) {
    let state = AppState {
        db: Database::open(None),
        uploads: UploadStore::new(None),
        mailer: Mailer::Mock,
        tokens: AuthTokens::new("test-secret"),
        config: ServerConfig {
            frontend_url: "http://localhost:3000".to_string(),
            skip_mx_check: true,
            permissive_cors: true,
        },
    };
    (build_router(state.clone()), state)
}

/// Fire one request and return (status, parsed JSON body).
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Fire a multipart request built from simple text fields.
pub async fn multipart_request(
    app: &Router,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
) -> (StatusCode, Value) {
    const BOUNDARY: &str = "townsquare-test-boundary";

    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Register a user and return (token, user_id).
pub async fn register_user(app: &Router, username: &str) -> (String, String) {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": username,
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password1",
            "hometown": "Springfield",
            "city": "Springfield",
            "state": "IL",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
    (
        body["token"].as_str().expect("token").to_string(),
        body["id"].as_str().expect("id").to_string(),
    )
}

/// Promote a registered user to platform admin directly in the store.
pub fn make_admin(state: &AppState, user_id: &str) {
    state.db.users.update(user_id, |u| u.role = Role::Admin);
}

/// Create a community as the given user and return its ID. Communities
/// created by platform admins are approved immediately.
pub async fn create_community(
    app: &Router,
    token: &str,
    name: &str,
    city: &str,
    requires_approval: bool,
) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/api/communities",
        Some(token),
        Some(json!({
            "name": name,
            "description": format!("{name} description"),
            "city": city,
            "state": "IL",
            "requiresApproval": requires_approval,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "community creation failed: {body}");
    body["id"].as_str().expect("community id").to_string()
}

/// Register an admin user and return (token, user_id).
///
/// Registration then promotion — a fresh token is not needed because the
/// role is read from the store on every request.
pub async fn register_admin(app: &Router, state: &AppState, username: &str) -> (String, String) {
    let (token, user_id) = register_user(app, username).await;
    make_admin(state, &user_id);
    (token, user_id)
}
