//! Health check handlers.

use axum::Json;
use axum::extract::State;

use broker_core::traits::storage::LogStore;

use crate::dto::response::{ComponentHealth, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /health/detailed
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let job_store = ComponentHealth {
        backend: state.stores.backend().to_string(),
        healthy: state.stores.health_check().await.unwrap_or(false),
    };
    let log_store = ComponentHealth {
        backend: state.logs.provider_type().to_string(),
        healthy: state.logs.health_check().await.unwrap_or(false),
    };
    let jobs = state.scheduler.counts().await.ok();

    let status = if job_store.healthy && log_store.healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        job_store,
        log_store,
        jobs,
    })
}
