//! Shared helpers for HTTP-level tests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::router::create_router_with_state;
use crate::config::AppConfig;
use crate::domain::notification::Notification;
use crate::domain::task::Task;
use crate::infrastructure::auth::{JwtConfig, JwtService};
use crate::infrastructure::membership::InMemoryDirectory;
use crate::infrastructure::storage::StorageFactory;

pub struct TestUser {
    pub token: String,
    pub user_id: String,
}

/// Full router over in-memory storage with a fixed signing secret
pub fn test_app() -> Router {
    let state = crate::assemble_app_state(
        Arc::new(InMemoryDirectory::new()),
        StorageFactory::create_in_memory::<Notification>(),
        StorageFactory::create_in_memory::<Task>(),
        &AppConfig::default(),
        Arc::new(JwtService::new(JwtConfig::new("test-secret", 1))),
    );

    create_router_with_state(state)
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    send_raw(app, method, uri, token, &body).await
}

/// Sign up with password `secret1`
pub async fn signup(app: &Router, name: &str, email: &str) -> TestUser {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({"name": name, "email": email, "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    TestUser {
        token: body["token"].as_str().unwrap().to_string(),
        user_id: body["user"]["id"].as_str().unwrap().to_string(),
    }
}

/// Create a team and return its projection
pub async fn create_team_view(app: &Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/team/create",
        Some(token),
        Some(json!({"name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);

    body["team"].clone()
}

/// Create a team and return its code
pub async fn create_team(app: &Router, token: &str, name: &str) -> String {
    let team = create_team_view(app, token, name).await;
    team["teamCode"].as_str().unwrap().to_string()
}

pub async fn join_team(app: &Router, token: &str, code: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/team/join",
        Some(token),
        Some(json!({"teamCode": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "join failed: {}", body);

    body
}
