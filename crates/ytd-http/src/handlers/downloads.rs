//! `/api/v1/download*` handlers (§6): create, inspect, list, cancel and tail
//! the logs of single-URL download jobs.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ytd_core::{CoreError, JobKind};
use ytd_engine::JobFilter;

use crate::dispatch::{build_job_callback, DispatchDeps};
use crate::dto::{
    CancelResponse, CreateDownloadRequest, JobListResponse, JobResponse, ListJobsQuery,
    LogsResponse,
};
use crate::error::HttpError;
use crate::state::AppState;

pub(crate) fn dispatch_deps(state: &AppState) -> Arc<DispatchDeps> {
    Arc::new(DispatchDeps {
        store: state.job_store.clone(),
        downloader: state.downloader.clone(),
        inspector: state.inspector.clone(),
        vault: state.vault.clone(),
        retention: state.retention.clone(),
        webhook: state.webhook.clone(),
        storage_dir: state.config.storage_dir.clone(),
        file_retention_hours: state.config.file_retention_hours,
        default_stall_timeout_sec: state.config.progress_timeout_sec,
    })
}

pub async fn create_download(
    State(state): State<AppState>,
    Json(request): Json<CreateDownloadRequest>,
) -> Result<(StatusCode, Json<JobResponse>), HttpError> {
    ytd_core::validate_url(&request.url, &state.config.allowed_domains)?;

    let payload = request.into_payload();
    let callback = build_job_callback(dispatch_deps(&state));
    let id = state
        .worker_pool
        .submit(JobKind::Single, payload, None, callback)
        .await?;

    let job = state
        .job_store
        .get(id)
        .await
        .ok_or_else(|| CoreError::Internal("job vanished immediately after submission".into()))?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

pub async fn list_downloads(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Json<JobListResponse> {
    let filter = JobFilter {
        state: query.state,
        kind: query.kind,
        parent_batch_id: None,
    };
    let jobs = state.job_store.list(&filter).await;
    Json(JobListResponse {
        jobs: jobs.into_iter().map(Into::into).collect(),
    })
}

pub async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::JobId>,
) -> Result<Json<JobResponse>, HttpError> {
    let job = state
        .job_store
        .get(id)
        .await
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
    Ok(Json(job.into()))
}

/// `DELETE /api/v1/download/{id}` (§6): `200` if the job was cancellable,
/// `400 CONFLICT` if it had already reached a terminal state.
pub async fn cancel_download(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::JobId>,
) -> Result<Json<CancelResponse>, HttpError> {
    let cancelled = state.worker_pool.cancel(id).await?;
    if !cancelled {
        return Err(CoreError::Conflict(format!("job {id} is already in a terminal state")).into());
    }
    Ok(Json(CancelResponse { cancelled }))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::JobId>,
) -> Result<Json<LogsResponse>, HttpError> {
    let logs = state
        .job_store
        .logs(id)
        .await
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
    Ok(Json(LogsResponse {
        total: logs.len(),
        logs,
    }))
}
