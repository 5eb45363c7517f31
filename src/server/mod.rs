//! HTTP surface over the service layer.

pub mod api;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::services::AuroraRuntime;

pub use api::{ApiError, AppState, SharedState, api_router};

/// Build the application router with its middleware stack.
pub fn build_router(state: SharedState, config: &Config) -> Router {
    let mut app = api_router()
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.toml.server.request_timeout_secs,
        )));
    if config.toml.server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Start the API server and run until Ctrl+C.
pub async fn start_server(config: &Config) -> Result<()> {
    let runtime = AuroraRuntime::from_config(config)?;
    runtime.burns.orchestrator().engine().writer().ensure_dir();
    tracing::info!(
        chain = ?runtime.model.chain(),
        policy = ?runtime.model.policy(),
        save_path = %config.save_path().display(),
        "Runtime initialised"
    );

    let app = build_router(Arc::new(AppState { runtime }), config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "Aurora Genesis Engine listening");
    println!("Aurora Genesis Engine running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
