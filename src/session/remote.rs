//! Remote session engine over a [`KvBackend`].
//!
//! Session data lives entirely in the backend under the namespace
//! `{key_prefix}{session_id}`; nothing is cached locally. Every call is
//! bounded by a timeout, surfaced as a retryable [`KvError::Timeout`].
//!
//! The session's fixed expiry is kept in the same namespace under
//! [`EXPIRY_KEY`], so every process resolving the ID sees the same window
//! and `Clean` drops it together with the data.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{SessionLookup, SessionStore, StoreRequest, readable_key, writable_key};
use crate::error::SessionError;
use crate::kv::{KvBackend, KvError};

/// Shortest TTL written to the backend, for sessions already at expiry.
const MIN_TTL: Duration = Duration::from_secs(1);

/// Reserved key holding the session's expiry. Not addressable by callers.
pub const EXPIRY_KEY: &str = "\u{0}expires";

/// Session store backed by a remote key-value service.
pub struct RemoteStore<K> {
    backend: K,
    key_prefix: String,
    timeout: Duration,
}

impl<K: KvBackend> RemoteStore<K> {
    pub fn new(backend: K, key_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
            timeout,
        }
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    fn namespace(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    async fn call<T>(
        &self,
        op: impl Future<Output = Result<T, KvError>>,
    ) -> Result<T, SessionError> {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(KvError::Timeout(self.timeout).into()),
        }
    }
}

/// Caller keys must not alias the expiry record.
fn user_key<'a>(
    key: &'a str,
    check: fn(&str) -> Result<&str, SessionError>,
    reserved: SessionError,
) -> Result<&'a str, SessionError> {
    let key = check(key)?;
    if key == EXPIRY_KEY {
        return Err(reserved);
    }
    Ok(key)
}

fn encode_expiry(expires: SystemTime) -> Vec<u8> {
    let nanos = expires
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    nanos.to_string().into_bytes()
}

fn decode_expiry(raw: &[u8]) -> Option<SystemTime> {
    let nanos: u128 = std::str::from_utf8(raw).ok()?.parse().ok()?;
    let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
    let subsec = (nanos % 1_000_000_000) as u32;
    UNIX_EPOCH.checked_add(Duration::new(secs, subsec))
}

/// TTL mirroring the session's fixed expiry.
fn ttl_until(expires: SystemTime) -> Duration {
    expires
        .duration_since(SystemTime::now())
        .unwrap_or_default()
        .max(MIN_TTL)
}

impl<K: KvBackend> SessionStore for RemoteStore<K> {
    async fn read(&self, req: &StoreRequest<'_>) -> Result<Vec<u8>, SessionError> {
        let key = user_key(req.key, readable_key, SessionError::KeyNotFound)?;
        let ns = self.namespace(req.session_id);
        self.call(self.backend.get(&ns, key))
            .await?
            .ok_or(SessionError::KeyNotFound)
    }

    async fn write(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        let key = user_key(req.key, writable_key, SessionError::KeyFormat)?;
        let value = req.value.ok_or(SessionError::KeyFormat)?;
        let ns = self.namespace(req.session_id);
        self.call(self.backend.set(&ns, key, value, ttl_until(req.expires)))
            .await
    }

    async fn remove(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        let key = user_key(req.key, writable_key, SessionError::KeyFormat)?;
        let ns = self.namespace(req.session_id);
        self.call(self.backend.delete(&ns, key)).await
    }

    async fn clean(&self, session_id: &str) -> Result<(), SessionError> {
        let ns = self.namespace(session_id);
        self.call(self.backend.delete_all(&ns)).await.inspect_err(|e| {
            tracing::error!(session_id, error = %e, "Failed to clean remote session");
        })
    }

    async fn lookup(&self, session_id: &str) -> Result<SessionLookup, SessionError> {
        let ns = self.namespace(session_id);
        let Some(raw) = self.call(self.backend.get(&ns, EXPIRY_KEY)).await? else {
            return Ok(SessionLookup::Untracked);
        };
        decode_expiry(&raw)
            .map(SessionLookup::Active)
            .ok_or_else(|| KvError::Protocol(format!("{ns} has a corrupt expiry record")).into())
    }

    async fn register(&self, session_id: &str, expires: SystemTime) -> Result<(), SessionError> {
        let ns = self.namespace(session_id);
        self.call(self.backend.set(
            &ns,
            EXPIRY_KEY,
            &encode_expiry(expires),
            ttl_until(expires),
        ))
        .await
    }

    fn evict_expired(&self, _now: SystemTime) -> usize {
        // Backend TTLs own expiry.
        0
    }
}
