//! Submitter-facing job handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use broker_entity::job::{Job, JobEvent};

use crate::dto::request::{ListJobsQuery, SubmitJobRequest};
use crate::error::ApiError;
use crate::extractors::parse_job_id;
use crate::state::AppState;

/// POST /jobs
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(req) = payload?;
    let job = state.scheduler.submit(req.into()).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs?active=&submitter=
pub async fn list_jobs(
    State(state): State<AppState>,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let Query(query) = query?;
    let jobs = state
        .scheduler
        .list_jobs(query.active, query.submitter.as_deref())
        .await?;
    Ok(Json(jobs))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Job>, ApiError> {
    let Path(id) = id?;
    let job = state.scheduler.get_job(parse_job_id(&id)?).await?;
    Ok(Json(job))
}

/// DELETE /jobs/{id}
pub async fn remove_job(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.scheduler.remove(parse_job_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /jobs/{id}/events
pub async fn job_events(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<JobEvent>>, ApiError> {
    let Path(id) = id?;
    let events = state.scheduler.history(parse_job_id(&id)?).await?;
    Ok(Json(events))
}
