//! Route definitions for the JobBroker HTTP API.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with every route, the upload body limit, and request logging.
pub fn build_router(state: AppState) -> Router {
    let body_limit =
        usize::try_from(state.config.storage.max_logfile_size_bytes).unwrap_or(usize::MAX);

    Router::new()
        .merge(job_routes())
        .merge(runner_routes())
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Submitter endpoints: jobs, their history, and logfiles.
fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/jobs",
            get(handlers::jobs::list_jobs).post(handlers::jobs::submit_job),
        )
        .route(
            "/jobs/{id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::remove_job),
        )
        .route("/jobs/{id}/events", get(handlers::jobs::job_events))
        .route(
            "/jobs/{id}/logs",
            get(handlers::logs::download_logfile).post(handlers::logs::upload_logfile),
        )
}

/// Runner endpoints: claim and report.
fn runner_routes() -> Router<AppState> {
    Router::new()
        .route("/runners/available-job", get(handlers::runners::claim_job))
        .route("/runners/update-job", put(handlers::runners::update_job))
}

/// Health endpoints.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
