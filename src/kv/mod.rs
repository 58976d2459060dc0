//! Minimal remote key-value contract consumed by the remote session engine.
//!
//! Entries are addressed by `(namespace, key)`; the session engine uses one
//! namespace per session so a whole session can be dropped with
//! [`KvBackend::delete_all`].

pub mod dynamodb;
pub mod memory;

use std::future::Future;
use std::time::Duration;

/// Failure talking to a remote key-value store.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("remote store request failed: {0}")]
    Request(String),

    #[error("remote store returned a malformed item: {0}")]
    Protocol(String),

    #[error("remote store call timed out after {0:?}")]
    Timeout(Duration),
}

impl KvError {
    /// Transport failures and timeouts may succeed on retry; protocol
    /// errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KvError::Request(_) | KvError::Timeout(_))
    }
}

/// GET / SET-with-TTL / DEL / bulk-DEL over a remote store.
pub trait KvBackend: Send + Sync {
    /// Fetch one value. `Ok(None)` when absent or expired.
    fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, KvError>> + Send;

    /// Store a value, expiring it after `ttl`.
    fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl Future<Output = Result<(), KvError>> + Send;

    /// Delete one value. Deleting a missing key is not an error.
    fn delete(&self, namespace: &str, key: &str)
    -> impl Future<Output = Result<(), KvError>> + Send;

    /// Delete every value in a namespace.
    fn delete_all(&self, namespace: &str) -> impl Future<Output = Result<(), KvError>> + Send;
}
