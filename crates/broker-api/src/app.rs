//! Application builder: wires backends, the dispatch engine, background
//! tasks, and the HTTP server together.

use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use broker_core::config::AppConfig;
use broker_core::error::{AppError, ErrorKind};
use broker_core::result::AppResult;
use broker_database::StoreManager;
use broker_storage::LogStoreManager;
use broker_worker::LeaseReaper;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the JobBroker server until a shutdown signal arrives.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!(
        backend = %config.database.backend,
        storage = %config.storage.provider,
        "Starting JobBroker server"
    );

    let stores = StoreManager::new(&config.database).await?;
    let logs = LogStoreManager::new(&config.storage).await?;
    let state = AppState::new(config.clone(), stores.clone(), logs);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reaper_handle = if config.scheduler.lease.enabled {
        let reaper = LeaseReaper::new(state.scheduler.clone(), &config.scheduler.lease);
        Some(reaper.spawn(shutdown_rx.clone()))
    } else {
        info!("Lease reaper disabled");
        None
    };

    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
    })?;

    info!(%addr, "JobBroker server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;

    if let Some(handle) = reaper_handle {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, handle).await.is_err() {
            warn!("Lease reaper did not stop within the shutdown grace period");
        }
    }

    stores.close().await;
    info!("JobBroker server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
