//! PROFILEGATE Server Entry Point
//!
//! Bootstraps configuration and tracing, starts the verdict cache sweeper,
//! and serves the gated page proxy until Ctrl+C or SIGTERM.

use std::sync::Arc;

use profilegate_api::{
    create_router, init_tracing, AppState, GateConfig, GateError, GateResult,
    HttpProfileBackend, PageProxy, ProfileGate, TelemetryConfig,
};
use profilegate_core::{CacheSweeper, VerdictCache};

#[tokio::main]
async fn main() -> GateResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let config = GateConfig::from_env();

    let cache = Arc::new(VerdictCache::new());
    let sweeper = CacheSweeper::spawn(Arc::clone(&cache), config.sweep_interval);

    let backend = HttpProfileBackend::from_config(&config)?;
    let gate = ProfileGate::new(Arc::clone(&cache), Arc::new(backend))
        .with_cache_ttl(config.cache_ttl);
    let proxy = PageProxy::from_config(&config)?;

    let app = create_router(AppState::new(gate, proxy));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GateError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        %addr,
        backend_url = %config.backend_url,
        pages_url = %config.pages_url,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "Starting PROFILEGATE server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GateError::Server(e.to_string()))?;

    sweeper.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = wait_for_sigterm() => {
            tracing::info!("Received SIGTERM signal");
        }
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
