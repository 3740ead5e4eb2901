//! `/api/v1/metadata` and `/api/v1/formats` handlers (§6): read-only
//! inspection of a URL without ever invoking a download.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use ytd_core::{FormatInfo, MetadataExtractorPort, VideoMetadata};

use crate::dto::UrlQuery;
use crate::error::HttpError;
use crate::state::AppState;

pub async fn get_metadata(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<VideoMetadata>, HttpError> {
    ytd_core::validate_url(&query.url, &state.config.allowed_domains)?;
    let metadata = state.inspector.metadata(&query.url).await?;
    Ok(Json(metadata))
}

#[derive(Serialize)]
pub struct FormatsResponse {
    formats: Vec<FormatInfo>,
}

pub async fn get_formats(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<FormatsResponse>, HttpError> {
    ytd_core::validate_url(&query.url, &state.config.allowed_domains)?;
    let formats = state.inspector.formats(&query.url).await?;
    Ok(Json(FormatsResponse { formats }))
}
