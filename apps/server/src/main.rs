//! # Kopi POS Server
//!
//! Entry point: configuration, database, router, graceful shutdown.

use std::net::SocketAddr;
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use kopi_db::{Database, DbConfig};
use kopi_server::{build_app, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Kopi POS server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    // The default database path lives under ./data
    if let Some(parent) = Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Connect and migrate
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    let app = build_app(AppState::new(db));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
    }
    info!("Shutdown signal received");
}
