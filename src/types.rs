//! Shared request/response DTOs.

use serde::{Deserialize, Serialize};

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
}

/// GET /session/data/{key} response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueResponse {
    pub key: String,
    /// Stored bytes, lossily decoded as UTF-8.
    pub value: String,
}

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
