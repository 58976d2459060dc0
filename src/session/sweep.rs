//! Periodic eviction of expired sessions.
//!
//! The read/write path never checks expiry; this task is what bounds the
//! local engine's memory.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionStore;

/// Evict expired sessions once. Returns how many were removed.
pub fn sweep_once<S: SessionStore>(store: &S) -> usize {
    let evicted = store.evict_expired(SystemTime::now());
    if evicted > 0 {
        tracing::debug!(evicted, "Swept expired sessions");
    }
    evicted
}

/// Spawn a task sweeping `store` every `every` until aborted.
pub fn spawn_sweeper<S: SessionStore + 'static>(store: Arc<S>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(store.as_ref());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::local::LocalStore;

    #[tokio::test]
    async fn test_sweep_once() {
        let store = LocalStore::new();
        let now = SystemTime::now();
        store
            .register("old", now - Duration::from_secs(5))
            .await
            .unwrap();
        store
            .register("live", now + Duration::from_secs(1800))
            .await
            .unwrap();

        assert_eq!(sweep_once(&store), 1);
        assert_eq!(store.session_ids(), vec!["live".to_string()]);
        assert_eq!(sweep_once(&store), 0);
    }

    #[tokio::test]
    async fn test_sweeper_task_evicts() {
        let store = Arc::new(LocalStore::new());
        store
            .register("old", SystemTime::now() - Duration::from_secs(5))
            .await
            .unwrap();

        let task = spawn_sweeper(Arc::clone(&store), Duration::from_millis(10));
        // The first tick fires immediately.
        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();

        assert!(store.is_empty());
    }
}
