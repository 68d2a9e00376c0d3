//! Logfile upload and download handlers.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use broker_core::error::AppError;

use crate::dto::response::LogfileResponse;
use crate::error::ApiError;
use crate::extractors::parse_job_id;
use crate::state::AppState;

/// Multipart field carrying the logfile.
const LOGFILE_FIELD: &str = "logfile";

/// POST /jobs/{id}/logs
pub async fn upload_logfile(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<LogfileResponse>), ApiError> {
    let Path(id) = id?;
    let id = parse_job_id(&id)?;
    let mut multipart = multipart?;

    let mut data: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some(LOGFILE_FIELD) {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
            );
        }
    }

    let data = data.ok_or_else(|| AppError::validation("logfile field is required"))?;
    let size_bytes = data.len() as u64;
    let handle = state.scheduler.upload_logfile(id, data).await?;

    Ok((
        StatusCode::CREATED,
        Json(LogfileResponse {
            identifier: id,
            logfile_handle: handle,
            size_bytes,
        }),
    ))
}

/// GET /jobs/{id}/logs
///
/// A job without a logfile answers 404, like a missing job.
pub async fn download_logfile(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let id = parse_job_id(&id)?;

    let data = state
        .scheduler
        .read_logfile(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Logfile for job #{id} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"job-{id}.log\""),
            ),
        ],
        data,
    )
        .into_response())
}
