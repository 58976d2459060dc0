//! L42 Session — server-side sessions for Axum handlers.
//!
//! A session ID is minted per client and bound to it with a cookie; handler
//! code reads and writes per-session values through a `SessionHandle`
//! backed by either the in-process engine or a remote key-value engine.

pub mod config;
pub mod error;
pub mod id;
pub mod kv;
pub mod routes;
pub mod session;
pub mod types;

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::SessionConfig;
use crate::session::middleware::session_middleware;
use crate::session::{SessionManager, SessionStore};

/// Shared application state available to all route handlers.
pub struct AppState<S> {
    pub config: SessionConfig,
    pub manager: Arc<SessionManager<S>>,
}

/// Build the Axum router with session middleware and routes.
pub fn create_app<S: SessionStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let manager = state.manager.clone();

    let session_routes = Router::new()
        .route(
            "/data/{key}",
            get(routes::data::get_value::<S>)
                .put(routes::data::put_value::<S>)
                .delete(routes::data::delete_value::<S>),
        )
        .route("/logout", post(routes::logout::logout::<S>))
        .layer(from_fn(move |req, next| {
            let manager = manager.clone();
            session_middleware(manager, req, next)
        }));

    Router::new()
        .route("/health", get(routes::health::health::<S>))
        .nest("/session", session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
