//! `/api/v1/cookies*` handlers (§6): upload, list, inspect and delete
//! encrypted browser cookie jars used for authenticated downloads.

use axum::extract::{Path, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ytd_core::CredentialVaultPort;

use crate::dto::{CredentialListResponse, CredentialResponse, UploadCookiesRequest};
use crate::error::HttpError;
use crate::state::AppState;

pub async fn upload_cookies(
    State(state): State<AppState>,
    Json(request): Json<UploadCookiesRequest>,
) -> Result<Json<CredentialResponse>, HttpError> {
    let jar = BASE64
        .decode(request.cookie_jar_base64.as_bytes())
        .map_err(|e| HttpError::BadRequest(format!("cookie_jar_base64 is not valid base64: {e}")))?;

    let metadata = state
        .vault
        .store(
            request.display_name,
            request.source_browser,
            request.covered_domains,
            jar,
        )
        .await?;
    Ok(Json(metadata.into()))
}

pub async fn list_cookies(State(state): State<AppState>) -> Result<Json<CredentialListResponse>, HttpError> {
    let credentials = state.vault.list().await?;
    Ok(Json(CredentialListResponse {
        credentials: credentials.into_iter().map(Into::into).collect(),
    }))
}

pub async fn get_cookies(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::CredentialId>,
) -> Result<Json<CredentialResponse>, HttpError> {
    let metadata = state.vault.metadata(id).await?;
    Ok(Json(metadata.into()))
}

pub async fn delete_cookies(
    State(state): State<AppState>,
    Path(id): Path<ytd_core::CredentialId>,
) -> Result<(), HttpError> {
    state.vault.delete(id).await?;
    Ok(())
}
