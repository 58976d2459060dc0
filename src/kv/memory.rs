//! Process-local [`KvBackend`] for development and testing.
//!
//! Behaves like a remote store with per-entry TTLs, but lives in a
//! `DashMap`. Not shared across processes.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{KvBackend, KvError};

/// Value and deadline; `None` outlives any representable instant.
type Entry = (Vec<u8>, Option<Instant>);

/// In-memory key-value store keyed by `(namespace, key)`.
#[derive(Default)]
pub struct InMemoryKv {
    store: DashMap<(String, String), Entry>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored (including expired).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl KvBackend for InMemoryKv {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let id = (namespace.to_string(), key.to_string());
        let Some(entry) = self.store.get(&id) else {
            return Ok(None);
        };
        let (value, deadline) = entry.value();

        if deadline.is_some_and(|d| Instant::now() >= d) {
            drop(entry); // Release the read lock before removing
            self.store.remove(&id);
            return Ok(None);
        }

        Ok(Some(value.clone()))
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), KvError> {
        self.store.insert(
            (namespace.to_string(), key.to_string()),
            (value.to_vec(), Instant::now().checked_add(ttl)),
        );
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), KvError> {
        self.store
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), KvError> {
        self.store.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }
}
