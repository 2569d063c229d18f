//! stash server entry point.
//!
//! Boots the offline cache controller in front of the configured origin and
//! serves it over HTTP. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use stash_client::{Controller, FetchClient, FetchConfig};
use stash_core::{AppConfig, CacheDb};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod admin;
mod error;
mod handler;
mod proxy;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, listen = %config.listen_addr, "starting stash");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let controller = Arc::new(Controller::from_config(&config, fetcher, db)?);

    if let Err(e) = controller.activate().await {
        tracing::warn!(
            error = %e,
            "activation failed; serving without offline fallback until {}/activate succeeds",
            config.admin_prefix
        );
    }

    let state = handler::AppState::new(controller, &config)?;
    let app = handler::app(state, &config.admin_prefix);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
