//! Server-side session management.
//!
//! Provides the `SessionStore` trait for pluggable storage, the local
//! (in-process) and remote (key-value service) engines behind it, the
//! per-request `SessionHandle`, and the `SessionManager` that binds session
//! IDs to clients through a cookie.

pub mod cookie;
pub mod handle;
pub mod local;
pub mod manager;
pub mod middleware;
pub mod remote;
pub mod sweep;

use std::future::Future;
use std::time::SystemTime;

use crate::error::SessionError;
use crate::kv::dynamodb::DynamoDbKv;

pub use handle::SessionHandle;
pub use local::LocalStore;
pub use manager::SessionManager;
pub use remote::RemoteStore;

/// One storage operation against a single session key.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub session_id: &'a str,
    /// Fixed expiry of the owning session.
    pub expires: SystemTime,
    pub key: &'a str,
    /// Only meaningful for writes.
    pub value: Option<&'a [u8]>,
}

impl<'a> StoreRequest<'a> {
    pub fn new(session_id: &'a str, expires: SystemTime, key: &'a str) -> Self {
        Self {
            session_id,
            expires,
            key,
            value: None,
        }
    }

    pub fn with_value(mut self, value: &'a [u8]) -> Self {
        self.value = Some(value);
        self
    }
}

/// What a store knows about a client-presented session ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLookup {
    /// Registered, with its fixed expiry.
    Active(SystemTime),
    /// The store tracks sessions and this ID is not one of them.
    Unknown,
    /// The store does not track session membership; the ID is taken as is.
    Untracked,
}

/// Pluggable session storage engine.
///
/// Implementations must be `Send + Sync` for use in Axum's async handlers.
pub trait SessionStore: Send + Sync {
    /// Read one value. `KeyNotFound` for an empty or absent key.
    fn read(
        &self,
        req: &StoreRequest<'_>,
    ) -> impl Future<Output = Result<Vec<u8>, SessionError>> + Send;

    /// Store or overwrite one value. `KeyFormat` for an empty key.
    fn write(&self, req: &StoreRequest<'_>)
    -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Delete one value; a missing key is not an error. `KeyFormat` for an
    /// empty key.
    fn remove(
        &self,
        req: &StoreRequest<'_>,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Delete every value of a session.
    fn clean(&self, session_id: &str) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Resolve a client-presented session ID.
    fn lookup(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<SessionLookup, SessionError>> + Send;

    /// Record a freshly minted session. Never replaces an existing one.
    fn register(
        &self,
        session_id: &str,
        expires: SystemTime,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Drop sessions whose expiry is at or before `now`, returning how many
    /// were evicted.
    fn evict_expired(&self, now: SystemTime) -> usize;
}

/// Type-erased session store supporting both engines.
///
/// Since `SessionStore` uses RPITIT, it's not object-safe. This enum
/// dispatches manually instead.
pub enum AnyStore {
    Local(LocalStore),
    DynamoDb(RemoteStore<DynamoDbKv>),
}

impl SessionStore for AnyStore {
    async fn read(&self, req: &StoreRequest<'_>) -> Result<Vec<u8>, SessionError> {
        match self {
            AnyStore::Local(s) => s.read(req).await,
            AnyStore::DynamoDb(s) => s.read(req).await,
        }
    }

    async fn write(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        match self {
            AnyStore::Local(s) => s.write(req).await,
            AnyStore::DynamoDb(s) => s.write(req).await,
        }
    }

    async fn remove(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        match self {
            AnyStore::Local(s) => s.remove(req).await,
            AnyStore::DynamoDb(s) => s.remove(req).await,
        }
    }

    async fn clean(&self, session_id: &str) -> Result<(), SessionError> {
        match self {
            AnyStore::Local(s) => s.clean(session_id).await,
            AnyStore::DynamoDb(s) => s.clean(session_id).await,
        }
    }

    async fn lookup(&self, session_id: &str) -> Result<SessionLookup, SessionError> {
        match self {
            AnyStore::Local(s) => s.lookup(session_id).await,
            AnyStore::DynamoDb(s) => s.lookup(session_id).await,
        }
    }

    async fn register(&self, session_id: &str, expires: SystemTime) -> Result<(), SessionError> {
        match self {
            AnyStore::Local(s) => s.register(session_id, expires).await,
            AnyStore::DynamoDb(s) => s.register(session_id, expires).await,
        }
    }

    fn evict_expired(&self, now: SystemTime) -> usize {
        match self {
            AnyStore::Local(s) => s.evict_expired(now),
            AnyStore::DynamoDb(s) => s.evict_expired(now),
        }
    }
}

/// Reject an empty key on the read path.
pub(crate) fn readable_key(key: &str) -> Result<&str, SessionError> {
    if key.is_empty() {
        return Err(SessionError::KeyNotFound);
    }
    Ok(key)
}

/// Reject an empty key on the write/remove path.
pub(crate) fn writable_key(key: &str) -> Result<&str, SessionError> {
    if key.is_empty() {
        return Err(SessionError::KeyFormat);
    }
    Ok(key)
}
