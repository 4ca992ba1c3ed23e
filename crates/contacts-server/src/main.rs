//! # contacts-server
//!
//! HTTP entry point: loads configuration, opens the selected storage
//! backend and serves the REST API until Ctrl+C.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use contacts_server::api::{self, AppState};
use contacts_server::config::ServerConfig;
use contacts_server::repository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,contacts_server=debug")),
        )
        .init();

    info!("Starting contacts server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open storage (exits if the backend is unreachable)
    // -----------------------------------------------------------------------
    let repo = match repository::open_repository(&config).await {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize storage");
            return Err(e.into());
        }
    };

    let http_addr = config.http_addr;
    let app_state = AppState {
        repo,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
