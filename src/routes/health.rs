//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::AppState;
use crate::config::EngineKind;
use crate::session::SessionStore;
use crate::types::HealthResponse;

/// Health check — returns OK + active session engine.
pub async fn health<S: SessionStore + 'static>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    let engine = match state.config.engine {
        EngineKind::Local => "local",
        EngineKind::DynamoDb => "dynamodb",
    };
    Json(HealthResponse {
        status: "ok".into(),
        engine: engine.into(),
    })
}
