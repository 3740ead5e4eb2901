//! `/api/v1/channel/info` and `/api/v1/channel/download` handlers (§6): a
//! paginated, filtered, read-only listing of a channel's uploads, and a job
//! that downloads every item passing those filters (capped by
//! `max_downloads`).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ytd_core::{ChannelInfo, CoreError, JobKind, MetadataExtractorPort};

use crate::dispatch::build_job_callback;
use crate::dto::{ChannelQuery, CreateDownloadRequest, JobResponse};
use crate::error::HttpError;
use crate::handlers::downloads::dispatch_deps;
use crate::state::AppState;

pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<ChannelInfo>, HttpError> {
    ytd_core::validate_url(&query.url, &state.config.allowed_domains)?;
    let filters = query.filters();
    let info = state
        .inspector
        .channel_info(&query.url, &filters, query.page, query.page_size)
        .await?;
    Ok(Json(info))
}

pub async fn create_channel_download(
    State(state): State<AppState>,
    Json(request): Json<CreateDownloadRequest>,
) -> Result<(StatusCode, Json<JobResponse>), HttpError> {
    ytd_core::validate_url(&request.url, &state.config.allowed_domains)?;

    let payload = request.into_payload();
    let callback = build_job_callback(dispatch_deps(&state));
    let id = state
        .worker_pool
        .submit(JobKind::Channel, payload, None, callback)
        .await?;

    let job = state
        .job_store
        .get(id)
        .await
        .ok_or_else(|| CoreError::Internal("job vanished immediately after submission".into()))?;
    Ok((StatusCode::CREATED, Json(job.into())))
}
