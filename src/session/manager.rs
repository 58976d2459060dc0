//! Session resolution: maps an inbound request to a [`SessionHandle`],
//! minting a new session and cookie when the client has none.

use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::cookie::{append_set_cookie, find_cookie, make_set_cookie, unescape_session_id};
use super::{AnyStore, LocalStore, RemoteStore, SessionHandle, SessionLookup, SessionStore};
use crate::config::{ConfigError, CookieSettings, EngineKind, SessionConfig};
use crate::error::SessionError;
use crate::id::new_session_id;
use crate::kv::dynamodb::DynamoDbKv;

/// Binds session IDs to clients and hands out session handles.
pub struct SessionManager<S> {
    store: Arc<S>,
    cookie: Arc<CookieSettings>,
    max_age: Duration,
}

impl<S: SessionStore> SessionManager<S> {
    /// Wrap an already constructed store. Fails if `config` is invalid.
    pub fn new(store: Arc<S>, config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            cookie: Arc::new(config.cookie.clone()),
            max_age: config.max_age,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    /// End of a window opening now.
    fn window_from_now(&self) -> Result<SystemTime, SessionError> {
        SystemTime::now()
            .checked_add(self.max_age)
            .ok_or_else(|| SessionError::Internal("session expiry out of range".into()))
    }

    /// Resolve the session for a request.
    ///
    /// Any new session cookie is appended to `response`. A cookie value that
    /// fails to unescape aborts resolution with [`SessionError::Decode`].
    pub async fn resolve(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<SessionHandle<S>, SessionError> {
        let presented = match find_cookie(request, &self.cookie.name) {
            Some(value) if !value.is_empty() => value,
            _ => return self.create(response).await,
        };

        let session_id = unescape_session_id(presented)?;

        match self.store.lookup(&session_id).await? {
            SessionLookup::Active(expires) => Ok(self.handle(session_id, expires)),
            SessionLookup::Untracked => {
                // First sighting of a trusted ID opens its window.
                let expires = self.window_from_now()?;
                self.store.register(&session_id, expires).await?;
                Ok(self.handle(session_id, expires))
            }
            SessionLookup::Unknown => {
                tracing::warn!(%session_id, "Unknown session ID presented; issuing a new session");
                self.create(response).await
            }
        }
    }

    /// Mint, register and cookie a brand-new session.
    pub async fn create(&self, response: &mut HeaderMap) -> Result<SessionHandle<S>, SessionError> {
        let session_id = new_session_id();
        let expires = self.window_from_now()?;

        self.store.register(&session_id, expires).await?;
        append_set_cookie(
            response,
            make_set_cookie(&self.cookie, &session_id, self.max_age),
        )?;

        tracing::info!(%session_id, "Session created");
        Ok(self.handle(session_id, expires))
    }

    fn handle(&self, session_id: String, expires: SystemTime) -> SessionHandle<S> {
        SessionHandle::new(
            session_id,
            expires,
            Arc::clone(&self.store),
            Arc::clone(&self.cookie),
        )
    }
}

/// Build the session manager selected by `config`.
///
/// Validates the configuration before constructing any engine.
pub async fn build(config: &SessionConfig) -> Result<SessionManager<AnyStore>, ConfigError> {
    config.validate()?;

    let store = match config.engine {
        EngineKind::Local => {
            tracing::info!("Using in-memory session engine");
            AnyStore::Local(LocalStore::new())
        }
        EngineKind::DynamoDb => {
            if config.dynamodb_table.is_empty() {
                return Err(ConfigError::Engine("DYNAMODB_TABLE is empty".into()));
            }
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = if config.dynamodb_endpoint.is_empty() {
                aws_sdk_dynamodb::Client::new(&sdk_config)
            } else {
                let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                    .endpoint_url(&config.dynamodb_endpoint)
                    .build();
                aws_sdk_dynamodb::Client::from_conf(dynamo_config)
            };
            tracing::info!(
                "Using DynamoDB session engine (table: {})",
                config.dynamodb_table
            );
            AnyStore::DynamoDb(RemoteStore::new(
                DynamoDbKv::new(client, config.dynamodb_table.clone()),
                config.key_prefix.clone(),
                config.remote_timeout,
            ))
        }
    };

    SessionManager::new(Arc::new(store), config)
}
