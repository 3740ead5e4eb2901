//! `/api/v1/playlist/preview` and `/api/v1/playlist/download` handlers (§6):
//! a paginated, read-only listing of a playlist's entries, and a job that
//! drives the adapter across every (filtered) item in one playlist.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ytd_core::{CoreError, JobKind, MetadataExtractorPort, PlaylistPreview};

use crate::dispatch::build_job_callback;
use crate::dto::{CreateDownloadRequest, JobResponse, PageQuery};
use crate::error::HttpError;
use crate::handlers::downloads::dispatch_deps;
use crate::state::AppState;

pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PlaylistPreview>, HttpError> {
    ytd_core::validate_url(&query.url, &state.config.allowed_domains)?;
    let preview = state
        .inspector
        .playlist_preview(&query.url, query.page, query.page_size)
        .await?;
    Ok(Json(preview))
}

pub async fn create_playlist_download(
    State(state): State<AppState>,
    Json(request): Json<CreateDownloadRequest>,
) -> Result<(StatusCode, Json<JobResponse>), HttpError> {
    ytd_core::validate_url(&request.url, &state.config.allowed_domains)?;

    let payload = request.into_payload();
    let callback = build_job_callback(dispatch_deps(&state));
    let id = state
        .worker_pool
        .submit(JobKind::Playlist, payload, None, callback)
        .await?;

    let job = state
        .job_store
        .get(id)
        .await
        .ok_or_else(|| CoreError::Internal("job vanished immediately after submission".into()))?;
    Ok((StatusCode::CREATED, Json(job.into())))
}
