//! remit-quotes server binary.

use anyhow::{Context, Result};
use remit_quotes::config::AppConfig;
use remit_quotes::{server, telemetry};
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.logging);
    config.validate().context("invalid configuration")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting remit-quotes");
    tracing::debug!(
        providers = config.providers.len(),
        cache_backend = ?config.cache.backend,
        refresh_enabled = config.refresh.enabled,
        "configuration loaded"
    );

    let app = server::build(&config).await.context("failed to build service")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = app.spawn_scheduler(shutdown_rx.clone());
    let cache_cleanup = app.spawn_cache_cleanup(shutdown_rx);

    let addr = config.server.socket_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(address = %addr, "quote server listening");

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    if let Some(handle) = scheduler {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("refresh scheduler did not stop in time");
        }
    }
    if let Some(handle) = cache_cleanup {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("cache cleanup did not stop in time");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
