//! `GET /files/{relative}` (§6, §8 scenario 9): streams a produced artifact
//! after confining the requested path to the storage root. Strong caching is
//! disabled since files are retention-scheduled for deletion.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use ytd_core::confine_to_storage_root;

use crate::error::HttpError;
use crate::state::AppState;

pub async fn serve_file(
    State(state): State<AppState>,
    Path(relative): Path<String>,
) -> Result<Response, HttpError> {
    let path = confine_to_storage_root(&state.config.storage_dir, &relative)?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ytd_core::CoreError::NotFound(relative.clone()))?;
    let stream = tokio_util::io::ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        body,
    )
        .into_response())
}
