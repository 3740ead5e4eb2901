//! Request/response shapes for `/api/v1/batch*` (§6).

use serde::{Deserialize, Serialize};
use ytd_core::{
    Batch, BatchCounts, BatchId, BatchPolicy, BatchState, ChannelFilters, CredentialId, JobPayload,
};

/// The options every child of a batch shares (§6: one `shared_options`
/// object applied across `urls[]`) — every [`JobPayload`] field except the
/// URL itself, which each array entry supplies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadOptions {
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default)]
    pub subtitles: bool,
    #[serde(default)]
    pub thumbnail: bool,
    #[serde(default)]
    pub metadata: bool,
    #[serde(default)]
    pub path_template: Option<String>,
    #[serde(default)]
    pub cookies_id: Option<CredentialId>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
    #[serde(default)]
    pub item_range: Option<String>,
    #[serde(default)]
    pub filters: ChannelFilters,
    #[serde(default)]
    pub max_downloads: Option<u32>,
}

impl DownloadOptions {
    #[must_use]
    pub fn into_payload(self, url: String) -> JobPayload {
        JobPayload {
            url,
            quality: self.quality,
            format: self.format,
            audio_only: self.audio_only,
            subtitles: self.subtitles,
            thumbnail: self.thumbnail,
            metadata: self.metadata,
            path_template: self.path_template,
            cookies_id: self.cookies_id,
            webhook_url: self.webhook_url,
            timeout_sec: self.timeout_sec,
            item_range: self.item_range,
            filters: self.filters,
            max_downloads: self.max_downloads,
        }
    }
}

/// `POST /api/v1/batch/download` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBatchRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub shared_options: DownloadOptions,
    #[serde(default = "default_policy")]
    pub policy: BatchPolicy,
    #[serde(default = "default_concurrency_cap")]
    pub concurrency_cap: u32,
}

const fn default_policy() -> BatchPolicy {
    BatchPolicy::ContinueOnError
}

const fn default_concurrency_cap() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub id: BatchId,
    pub state: BatchState,
    pub policy: BatchPolicy,
    pub concurrency_cap: u32,
    pub counts: BatchCounts,
    pub overall_percent: f64,
    pub child_ids: Vec<ytd_core::JobId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Batch> for BatchResponse {
    fn from(batch: Batch) -> Self {
        Self {
            id: batch.id,
            state: batch.state,
            policy: batch.policy,
            concurrency_cap: batch.concurrency_cap,
            counts: batch.counts,
            overall_percent: batch.overall_percent,
            child_ids: batch.child_ids,
            created_at: batch.created_at,
            completed_at: batch.completed_at,
        }
    }
}
