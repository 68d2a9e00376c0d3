//! Runner-facing handlers: claiming work and reporting status.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use broker_core::error::AppError;
use broker_core::types::JobId;

use crate::dto::request::UpdateJobRequest;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /runners/available-job
///
/// Claims the oldest waiting job. Responds 204 when there is none.
pub async fn claim_job(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.scheduler.claim_next().await? {
        Some(job) => Ok((StatusCode::OK, Json(job)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// PUT /runners/update-job
pub async fn update_job(
    State(state): State<AppState>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    let id = req
        .identifier
        .map(JobId)
        .ok_or_else(|| AppError::validation("identifier is required"))?;

    state.scheduler.update_status(id, &req.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
