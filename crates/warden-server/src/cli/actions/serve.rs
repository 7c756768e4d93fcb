use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::api;
use crate::config::ServerConfig;

/// Connect, bootstrap and serve until interrupted.
///
/// # Errors
///
/// Returns an error if start-up fails or the server stops abnormally.
pub async fn execute(config: ServerConfig) -> Result<()> {
    let manager = super::connect(&config).await?;
    let (state, _) = super::prepare(manager.client(), &config, false).await?;

    let app = api::router(state);
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(listen = %config.listen, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}
