//! Test utilities: app builders for both engines and cookie helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use l42_session::config::SessionConfig;
use l42_session::kv::memory::InMemoryKv;
use l42_session::session::{LocalStore, RemoteStore, SessionManager};
use l42_session::{AppState, create_app};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub type RemoteTestStore = RemoteStore<InMemoryKv>;

/// Build a test app with the local engine.
pub fn build_test_app() -> (axum::Router, Arc<AppState<LocalStore>>) {
    build_test_app_with_config(SessionConfig::test_default())
}

/// Build a local-engine test app with a custom config.
pub fn build_test_app_with_config(
    config: SessionConfig,
) -> (axum::Router, Arc<AppState<LocalStore>>) {
    let manager = SessionManager::new(Arc::new(LocalStore::new()), &config)
        .expect("test config must be valid");
    let state = Arc::new(AppState {
        config,
        manager: Arc::new(manager),
    });
    (create_app(state.clone()), state)
}

/// Build a test app with the remote engine over an in-memory KV.
pub fn build_remote_test_app() -> (axum::Router, Arc<AppState<RemoteTestStore>>) {
    let config = SessionConfig::test_default();
    let store = RemoteStore::new(
        InMemoryKv::new(),
        config.key_prefix.clone(),
        Duration::from_secs(1),
    );
    let manager = SessionManager::new(Arc::new(store), &config).expect("test config must be valid");
    let state = Arc::new(AppState {
        config,
        manager: Arc::new(manager),
    });
    (create_app(state.clone()), state)
}

/// Build a request, optionally carrying a raw session cookie value.
pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = cookie {
        builder = builder.header("Cookie", format!("l42_session={value}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Raw (still escaped) session cookie value from the first Set-Cookie header.
pub fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            s.split(';')
                .next()
                .and_then(|c| c.strip_prefix("l42_session="))
                .map(String::from)
        })
}

/// Helper to read response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
