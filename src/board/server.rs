use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::db::{BoardDb, DbHandle};
use super::ws;
use crate::config::{BoardToml, OrderingSection};

/// Configuration for the board server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
    pub ordering: OrderingSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_toml(&BoardToml::default())
    }
}

impl ServerConfig {
    pub fn from_toml(toml: &BoardToml) -> Self {
        Self {
            host: toml.server.host.clone(),
            port: toml.server.port,
            db_path: toml.server.db_path.clone(),
            dev_mode: false,
            ordering: toml.ordering.clone(),
        }
    }

    /// Dev mode listens on every interface.
    fn bind_host(&self) -> &str {
        if self.dev_mode { "0.0.0.0" } else { &self.host }
    }
}

/// Build the full application router with API and WebSocket routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler(ws_upgrade, ws_tx)),
        )
        .with_state(state)
}

/// Open (or create) the database file, creating parent directories.
pub fn open_database(db_path: &std::path::Path) -> Result<BoardDb> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    BoardDb::new(db_path).context("Failed to initialize board database")
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let db = open_database(&config.db_path)?;
    let (ws_tx, _rx) = broadcast::channel::<String>(256);

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        ws_tx,
        ordering: config.ordering.clone(),
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.bind_host(), config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr: SocketAddr = listener.local_addr()?;
    info!(addr = %local_addr, db = %config.db_path.display(), "board server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("board server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
        return;
    }
    info!("shutdown signal received");
}
