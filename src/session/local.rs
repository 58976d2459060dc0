//! In-process session engine.
//!
//! Two-level locking: the `DashMap` index guards session membership, and
//! each session's own `Mutex` guards its data. The index guard is always
//! released before a session lock is taken, so operations on different
//! sessions never contend past the index lookup.
//!
//! Sessions are lost on restart and not shared across processes. Memory
//! is bounded only by `clean` and the expiry sweep.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use super::{SessionLookup, SessionStore, StoreRequest, readable_key, writable_key};
use crate::error::SessionError;

/// One session held by the local engine.
#[derive(Debug)]
pub struct LocalSession {
    id: String,
    expires: SystemTime,
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl LocalSession {
    fn new(id: &str, expires: SystemTime) -> Self {
        Self {
            id: id.to_string(),
            expires,
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires(&self) -> SystemTime {
        self.expires
    }

    fn data(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A panic mid-insert cannot leave a HashMap half-written.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory session store.
#[derive(Default)]
pub struct LocalStore {
    index: DashMap<String, Arc<LocalSession>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently indexed (including expired).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// IDs of every indexed session.
    pub fn session_ids(&self) -> Vec<String> {
        self.index.iter().map(|e| e.key().clone()).collect()
    }

    fn get(&self, session_id: &str) -> Option<Arc<LocalSession>> {
        self.index.get(session_id).map(|e| Arc::clone(e.value()))
    }

    /// Existing session, or a new one registered with `expires`.
    fn get_or_create(&self, session_id: &str, expires: SystemTime) -> Arc<LocalSession> {
        if let Some(session) = self.get(session_id) {
            return session;
        }
        let entry = self
            .index
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(LocalSession::new(session_id, expires)));
        Arc::clone(entry.value())
    }
}

impl SessionStore for LocalStore {
    async fn read(&self, req: &StoreRequest<'_>) -> Result<Vec<u8>, SessionError> {
        let key = readable_key(req.key)?;
        let session = self.get(req.session_id).ok_or(SessionError::KeyNotFound)?;
        let data = session.data();
        data.get(key).cloned().ok_or(SessionError::KeyNotFound)
    }

    async fn write(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        let key = writable_key(req.key)?;
        let value = req.value.ok_or(SessionError::KeyFormat)?;
        let session = self.get_or_create(req.session_id, req.expires);
        session.data().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, req: &StoreRequest<'_>) -> Result<(), SessionError> {
        let key = writable_key(req.key)?;
        if let Some(session) = self.get(req.session_id) {
            session.data().remove(key);
        }
        Ok(())
    }

    async fn clean(&self, session_id: &str) -> Result<(), SessionError> {
        if let Some((_, session)) = self.index.remove(session_id) {
            // Handles still holding the Arc must not see stale data.
            session.data().clear();
        }
        Ok(())
    }

    async fn lookup(&self, session_id: &str) -> Result<SessionLookup, SessionError> {
        Ok(match self.get(session_id) {
            Some(session) => SessionLookup::Active(session.expires),
            None => SessionLookup::Unknown,
        })
    }

    async fn register(&self, session_id: &str, expires: SystemTime) -> Result<(), SessionError> {
        self.get_or_create(session_id, expires);
        Ok(())
    }

    fn evict_expired(&self, now: SystemTime) -> usize {
        let before = self.index.len();
        self.index.retain(|_, session| session.expires > now);
        before.saturating_sub(self.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn later() -> SystemTime {
        SystemTime::now() + Duration::from_secs(1800)
    }

    async fn put(store: &LocalStore, sid: &str, key: &str, value: &[u8]) {
        let req = StoreRequest::new(sid, later(), key).with_value(value);
        store.write(&req).await.unwrap();
    }

    async fn fetch(store: &LocalStore, sid: &str, key: &str) -> Result<Vec<u8>, SessionError> {
        store.read(&StoreRequest::new(sid, later(), key)).await
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = LocalStore::new();
        put(&store, "s1", "key", b"value").await;
        assert_eq!(fetch(&store, "s1", "key").await.unwrap(), b"value");
    }

    #[tokio::test]
    async fn test_first_write_creates_session() {
        let store = LocalStore::new();
        assert!(store.is_empty());
        put(&store, "s1", "k", b"v").await;
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.lookup("s1").await.unwrap(),
            SessionLookup::Active(_)
        ));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let store = LocalStore::new();
        assert!(matches!(
            fetch(&store, "nope", "k").await,
            Err(SessionError::KeyNotFound)
        ));
        put(&store, "s1", "k", b"v").await;
        assert!(matches!(
            fetch(&store, "s1", "other").await,
            Err(SessionError::KeyNotFound)
        ));
    }

    #[tokio::test]
    async fn test_empty_keys_rejected() {
        let store = LocalStore::new();
        let req = StoreRequest::new("s1", later(), "").with_value(b"v");
        assert!(matches!(store.write(&req).await, Err(SessionError::KeyFormat)));
        assert!(matches!(store.remove(&req).await, Err(SessionError::KeyFormat)));
        assert!(matches!(store.read(&req).await, Err(SessionError::KeyNotFound)));
        // Nothing was created
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let store = LocalStore::new();
        put(&store, "s1", "k", b"v").await;
        put(&store, "s1", "k", b"v").await;
        assert_eq!(fetch(&store, "s1", "k").await.unwrap(), b"v");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = LocalStore::new();
        put(&store, "s1", "k", b"v").await;
        let req = StoreRequest::new("s1", later(), "k");
        store.remove(&req).await.unwrap();
        assert!(fetch(&store, "s1", "k").await.is_err());
        // Second remove is a no-op
        store.remove(&req).await.unwrap();
    }

    #[tokio::test]
    async fn test_clean_drops_session() {
        let store = LocalStore::new();
        put(&store, "s1", "a", b"1").await;
        put(&store, "s1", "b", b"2").await;
        put(&store, "s2", "a", b"3").await;

        store.clean("s1").await.unwrap();

        assert!(matches!(fetch(&store, "s1", "a").await, Err(SessionError::KeyNotFound)));
        assert!(matches!(fetch(&store, "s1", "b").await, Err(SessionError::KeyNotFound)));
        assert_eq!(store.lookup("s1").await.unwrap(), SessionLookup::Unknown);
        // Other sessions untouched
        assert_eq!(fetch(&store, "s2", "a").await.unwrap(), b"3");
    }

    #[tokio::test]
    async fn test_register_keeps_existing_session() {
        let store = LocalStore::new();
        let first = later();
        store.register("s1", first).await.unwrap();
        put(&store, "s1", "k", b"v").await;

        store
            .register("s1", first + Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.lookup("s1").await.unwrap(), SessionLookup::Active(first));
        assert_eq!(fetch(&store, "s1", "k").await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn test_expired_session_still_readable() {
        let store = LocalStore::new();
        let past = SystemTime::now() - Duration::from_secs(10);
        store
            .write(&StoreRequest::new("old", past, "k").with_value(b"v"))
            .await
            .unwrap();
        // Expiry is enforced by the sweep, not the read path.
        assert_eq!(fetch(&store, "old", "k").await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let store = LocalStore::new();
        let now = SystemTime::now();
        store.register("old", now - Duration::from_secs(1)).await.unwrap();
        store.register("edge", now).await.unwrap();
        store.register("fresh", now + Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.evict_expired(now), 2);
        assert_eq!(store.session_ids(), vec!["fresh".to_string()]);
    }
}
