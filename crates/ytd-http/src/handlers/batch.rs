//! `/api/v1/batch*` handlers (§6): fan a list of URLs out into independently
//! scheduled child downloads sharing a batch-level concurrency gate.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ytd_core::{CoreError, JobPayload};

use crate::dispatch::build_job_callback;
use crate::dto::{BatchResponse, CreateBatchRequest};
use crate::error::HttpError;
use crate::handlers::downloads::dispatch_deps;
use crate::state::AppState;

pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), HttpError> {
    for url in &request.urls {
        ytd_core::validate_url(url, &state.config.allowed_domains)?;
    }

    let shared_options = request.shared_options;
    let payloads: Vec<JobPayload> = request
        .urls
        .into_iter()
        .map(|url| shared_options.clone().into_payload(url))
        .collect();

    let deps = dispatch_deps(&state);
    let callback = build_job_callback(deps);
    let make_child_callback = move |_index: usize, _job_id: ytd_core::JobId| callback.clone();

    let batch_id = state
        .batch_coordinator
        .create_batch(
            payloads,
            request.policy,
            request.concurrency_cap,
            make_child_callback,
        )
        .await?;

    let batch = state
        .batch_coordinator
        .status(batch_id)
        .await
        .ok_or_else(|| CoreError::Internal("batch vanished immediately after creation".into()))?;
    Ok((StatusCode::CREATED, Json(batch.into())))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::BatchId>,
) -> Result<Json<BatchResponse>, HttpError> {
    let batch = state
        .batch_coordinator
        .status(id)
        .await
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
    Ok(Json(batch.into()))
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::BatchId>,
) -> Result<Json<BatchResponse>, HttpError> {
    state.batch_coordinator.cancel(id).await?;
    let batch = state
        .batch_coordinator
        .status(id)
        .await
        .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
    Ok(Json(batch.into()))
}
