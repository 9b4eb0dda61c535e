//! offeyr-gateway server entry point.
//!
//! Starts the Axum HTTP server over the configured storage backend.

use std::net::SocketAddr;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use offeyr_gateway::api;
use offeyr_gateway::app_state::AppState;
use offeyr_gateway::config::GatewayConfig;
use offeyr_gateway::storage::{self, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting offeyr-gateway");

    // Select the storage backend
    let storage = match config.database_url.as_deref() {
        Some(url) => {
            let pool = storage::postgres::connect_and_migrate(url, &config).await?;
            tracing::info!("storage backend: postgres");
            Storage::postgres(pool)
        }
        None => {
            tracing::info!("storage backend: in-memory (no DATABASE_URL set)");
            Storage::in_memory()
        }
    };

    // Build application state
    let state = AppState::build(&config, storage);

    // Seed the fixed development accounts
    if state.bootstrap_accounts {
        state.auth.ensure_default_accounts().await?;
        tracing::info!("bootstrap accounts ready (admin/user/vendor)");
    }

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
