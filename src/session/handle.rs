//! Per-request session façade.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::SystemTime;

use super::cookie::{append_set_cookie, make_expired_cookie};
use super::{SessionStore, StoreRequest};
use crate::config::CookieSettings;
use crate::error::SessionError;

/// Handle to one session, inserted into request extensions by the session
/// middleware.
///
/// Each call is a single store operation: a key's read or write is atomic,
/// but a get-then-set sequence is not.
pub struct SessionHandle<S> {
    id: String,
    expires: SystemTime,
    store: Arc<S>,
    cookie: Arc<CookieSettings>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            expires: self.expires,
            store: Arc::clone(&self.store),
            cookie: Arc::clone(&self.cookie),
        }
    }
}

impl<S> std::fmt::Debug for SessionHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("expires", &self.expires)
            .finish_non_exhaustive()
    }
}

impl<S: SessionStore> SessionHandle<S> {
    pub(crate) fn new(
        id: String,
        expires: SystemTime,
        store: Arc<S>,
        cookie: Arc<CookieSettings>,
    ) -> Self {
        Self {
            id,
            expires,
            store,
            cookie,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fixed expiry set when the session was created. Never extended.
    pub fn expires(&self) -> SystemTime {
        self.expires
    }

    /// Informational only; reads and writes do not consult it.
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires
    }

    fn request<'a>(&'a self, key: &'a str) -> StoreRequest<'a> {
        StoreRequest::new(&self.id, self.expires, key)
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, SessionError> {
        if key.is_empty() {
            return Err(SessionError::KeyNotFound);
        }
        self.store.read(&self.request(key)).await
    }

    pub async fn set(&self, key: &str, value: impl AsRef<[u8]>) -> Result<(), SessionError> {
        if key.is_empty() {
            return Err(SessionError::KeyFormat);
        }
        let req = self.request(key).with_value(value.as_ref());
        self.store.write(&req).await
    }

    pub async fn del(&self, key: &str) -> Result<(), SessionError> {
        if key.is_empty() {
            return Err(SessionError::KeyFormat);
        }
        self.store.remove(&self.request(key)).await
    }

    /// Deserialize a value stored with [`SessionHandle::set_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, SessionError> {
        let bytes = self.get(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Store any serializable value as JSON.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes).await
    }

    /// Purge all session data and expire the client's cookie.
    ///
    /// The expired cookie is written to `sink` even when the purge fails;
    /// the purge error is still returned.
    pub async fn clean(&self, sink: &mut HeaderMap) -> Result<(), SessionError> {
        let purged = self.store.clean(&self.id).await;
        append_set_cookie(sink, make_expired_cookie(&self.cookie))?;
        if purged.is_ok() {
            tracing::info!(session_id = %self.id, "Session cleaned");
        }
        purged
    }
}

/// Extract SessionHandle from request extensions (put there by session middleware).
impl<S, St> FromRequestParts<St> for SessionHandle<S>
where
    S: SessionStore + 'static,
    St: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle<S>>()
            .cloned()
            .ok_or(SessionError::Internal(
                "Session middleware not configured".into(),
            ))
    }
}
