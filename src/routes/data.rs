//! GET/PUT/DELETE /session/data/{key}

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;

use crate::error::SessionError;
use crate::session::{SessionHandle, SessionStore};
use crate::types::{SuccessResponse, ValueResponse};

/// Read one session value.
pub async fn get_value<S: SessionStore + 'static>(
    session: SessionHandle<S>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>, SessionError> {
    let value = session.get(&key).await?;
    Ok(Json(ValueResponse {
        key,
        value: String::from_utf8_lossy(&value).into_owned(),
    }))
}

/// Store the request body under `key`.
pub async fn put_value<S: SessionStore + 'static>(
    session: SessionHandle<S>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, SessionError> {
    session.set(&key, &body).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Delete one session value.
pub async fn delete_value<S: SessionStore + 'static>(
    session: SessionHandle<S>,
    Path(key): Path<String>,
) -> Result<Json<SuccessResponse>, SessionError> {
    session.del(&key).await?;
    Ok(Json(SuccessResponse { success: true }))
}
