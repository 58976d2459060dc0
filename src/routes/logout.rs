//! POST /session/logout

use axum::Json;
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use crate::session::{SessionHandle, SessionStore};
use crate::types::SuccessResponse;

/// Purge the session and expire the client cookie.
///
/// The expired cookie is sent even when the purge fails.
pub async fn logout<S: SessionStore + 'static>(session: SessionHandle<S>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    match session.clean(&mut headers).await {
        Ok(()) => (headers, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => (headers, e).into_response(),
    }
}
