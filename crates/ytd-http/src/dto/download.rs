//! Request/response shapes for `/api/v1/download*` (§6).

use serde::{Deserialize, Serialize};
use ytd_core::{ChannelFilters, CredentialId, Job, JobFailure, JobId, JobKind, JobPayload, JobResult, JobState, LogEntry, Progress};

/// `POST /api/v1/download` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDownloadRequest {
    pub url: String,
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

impl CreateDownloadRequest {
    #[must_use]
    pub fn into_payload(self) -> JobPayload {
        JobPayload {
            url: self.url,
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

/// `POST /api/v1/download`, `GET /api/v1/download/{id}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub job_id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub progress: Progress,
    pub result: Option<JobResult>,
    pub error: Option<JobFailure>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
            state: job.state,
            progress: job.progress,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListJobsQuery {
    pub state: Option<JobState>,
    pub kind: Option<JobKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}
