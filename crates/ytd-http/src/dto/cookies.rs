//! Request/response shapes for `/api/v1/cookies*` (§6).

use serde::{Deserialize, Serialize};
use ytd_core::CredentialMetadata;

/// `POST /api/v1/cookies` request body. The jar itself arrives base64-encoded
/// in JSON rather than as a multipart upload, matching the rest of this
/// surface's all-JSON convention.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadCookiesRequest {
    pub display_name: String,
    #[serde(default)]
    pub source_browser: Option<String>,
    #[serde(default)]
    pub covered_domains: Vec<String>,
    pub cookie_jar_base64: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialResponse {
    #[serde(flatten)]
    pub metadata: CredentialMetadata,
}

impl From<CredentialMetadata> for CredentialResponse {
    fn from(metadata: CredentialMetadata) -> Self {
        Self { metadata }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialListResponse {
    pub credentials: Vec<CredentialResponse>,
}
