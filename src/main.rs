//! Local session server.
//!
//! Engine and cookie settings come from the environment (see
//! `SessionConfig::from_env`); `.env` is loaded if present.

use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use l42_session::config::{EngineKind, SessionConfig};
use l42_session::session::manager::build;
use l42_session::session::sweep::spawn_sweeper;
use l42_session::{AppState, create_app};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Init tracing: JSON when asked, pretty otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let config = SessionConfig::from_env().expect("Failed to load configuration");
    let manager = Arc::new(
        build(&config)
            .await
            .expect("Failed to build session store"),
    );

    if config.engine == EngineKind::Local {
        spawn_sweeper(Arc::clone(manager.store()), config.sweep_interval);
        tracing::info!(
            "Expiry sweep running every {}s",
            config.sweep_interval.as_secs()
        );
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        manager,
    });
    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting session server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
