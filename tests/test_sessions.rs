//! Session handle behavior under concurrency, for both engines.

use axum::http::HeaderMap;
use l42_session::config::{ConfigError, SessionConfig};
use l42_session::error::SessionError;
use l42_session::kv::memory::InMemoryKv;
use l42_session::session::manager::build;
use l42_session::session::{LocalStore, RemoteStore, SessionManager, SessionStore};
use std::sync::Arc;
use std::time::Duration;

fn local() -> SessionManager<LocalStore> {
    SessionManager::new(Arc::new(LocalStore::new()), &SessionConfig::test_default()).unwrap()
}

fn remote() -> SessionManager<RemoteStore<InMemoryKv>> {
    let store = RemoteStore::new(InMemoryKv::new(), "session:", Duration::from_secs(1));
    SessionManager::new(Arc::new(store), &SessionConfig::test_default()).unwrap()
}

async fn concurrent_distinct_keys<S: SessionStore + 'static>(manager: SessionManager<S>) {
    let session = manager
        .resolve(&HeaderMap::new(), &mut HeaderMap::new())
        .await
        .unwrap();

    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let session = session.clone();
            tokio::spawn(async move { session.set(&format!("key-{i}"), format!("v{i}")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for i in 0..64 {
        let value = session.get(&format!("key-{i}")).await.unwrap();
        assert_eq!(value, format!("v{i}").into_bytes());
    }
}

async fn concurrent_same_key<S: SessionStore + 'static>(manager: SessionManager<S>) {
    let session = manager
        .resolve(&HeaderMap::new(), &mut HeaderMap::new())
        .await
        .unwrap();
    let a = vec![b'a'; 4096];
    let b = vec![b'b'; 4096];

    let (first, second) = tokio::join!(
        tokio::spawn({
            let session = session.clone();
            let a = a.clone();
            async move { session.set("shared", a).await }
        }),
        tokio::spawn({
            let session = session.clone();
            let b = b.clone();
            async move { session.set("shared", b).await }
        }),
    );
    first.unwrap().unwrap();
    second.unwrap().unwrap();

    let stored = session.get("shared").await.unwrap();
    assert!(stored == a || stored == b, "value must be one whole write");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_local_concurrent_distinct_keys() {
    concurrent_distinct_keys(local()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_concurrent_distinct_keys() {
    concurrent_distinct_keys(remote()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_local_concurrent_same_key() {
    concurrent_same_key(local()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_concurrent_same_key() {
    concurrent_same_key(remote()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_session_creation_is_isolated() {
    let manager = Arc::new(local());

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let session = manager
                    .resolve(&HeaderMap::new(), &mut HeaderMap::new())
                    .await
                    .unwrap();
                session.set("owner", format!("client-{i}")).await.unwrap();
                session
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let session = task.await.unwrap();
        assert_eq!(
            session.get("owner").await.unwrap(),
            format!("client-{i}").into_bytes()
        );
    }
    assert_eq!(manager.store().len(), 32);
}

#[tokio::test]
async fn test_independent_stores_do_not_share_state() {
    let first = local();
    let second = local();

    let session = first
        .resolve(&HeaderMap::new(), &mut HeaderMap::new())
        .await
        .unwrap();
    session.set("k", b"v").await.unwrap();

    assert_eq!(first.store().len(), 1);
    assert!(second.store().is_empty());
}

#[tokio::test]
async fn test_clean_then_get_is_not_found_for_both_engines() {
    async fn check<S: SessionStore + 'static>(manager: SessionManager<S>) {
        let session = manager
            .resolve(&HeaderMap::new(), &mut HeaderMap::new())
            .await
            .unwrap();
        for key in ["a", "b", "c"] {
            session.set(key, key).await.unwrap();
        }

        session.clean(&mut HeaderMap::new()).await.unwrap();

        for key in ["a", "b", "c"] {
            assert!(matches!(
                session.get(key).await,
                Err(SessionError::KeyNotFound)
            ));
        }
    }

    check(local()).await;
    check(remote()).await;
}

#[tokio::test]
async fn test_builder_enforces_max_age_floor() {
    let mut config = SessionConfig::test_default();

    config.max_age = Duration::from_secs(1799);
    assert!(matches!(
        build(&config).await,
        Err(ConfigError::MaxAgeTooShort(1799))
    ));

    config.max_age = Duration::from_secs(1800);
    let manager = build(&config).await.unwrap();
    assert_eq!(manager.max_age(), Duration::from_secs(1800));
}
