//! The `Job` entity and its state machine (§3.1, §3.3).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::ids::{BatchId, CredentialId, JobId};
use crate::progress::{LogEntry, Progress};

/// What kind of download a job represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Single,
    Playlist,
    Channel,
    BatchChild,
}

/// A job's position in the state machine (§3.3). Terminal states are sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Output-path template substitutions, quality selectors and feature flags
/// common to every job kind (§4.A, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobPayload {
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
    /// Playlist/channel item range, e.g. `"1-10,15"` (§4.J).
    #[serde(default)]
    pub item_range: Option<String>,
    /// Channel listing filters, passed through to the adapter untouched.
    #[serde(default)]
    pub filters: ChannelFilters,
    /// Channel/playlist download cap.
    #[serde(default)]
    pub max_downloads: Option<u32>,
}

impl JobPayload {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: None,
            format: None,
            audio_only: false,
            subtitles: false,
            thumbnail: false,
            metadata: false,
            path_template: None,
            cookies_id: None,
            webhook_url: None,
            timeout_sec: None,
            item_range: None,
            filters: ChannelFilters::default(),
            max_downloads: None,
        }
    }
}

/// Date/duration/view-count/sort filters for channel listings and downloads
/// (§6 `GET /api/v1/channel/info`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChannelFilters {
    #[serde(default)]
    pub date_after: Option<String>,
    #[serde(default)]
    pub date_before: Option<String>,
    #[serde(default)]
    pub min_duration: Option<u64>,
    #[serde(default)]
    pub max_duration: Option<u64>,
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub max_views: Option<u64>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// Populated on `COMPLETED` (§3.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub relative_path: String,
    pub size_bytes: u64,
    pub title: Option<String>,
    pub duration_sec: Option<u64>,
    pub format: Option<String>,
    pub deletion_instant: Option<chrono::DateTime<chrono::Utc>>,
}

/// Populated on `FAILED` (§3.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobFailure {
    pub code: String,
    pub message: String,
}

impl From<&CoreError> for JobFailure {
    fn from(err: &CoreError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// A one-shot, observable cancellation handle shared between the worker pool
/// and the downloader adapter (§4.G, §5). Cheap to clone; all clones observe
/// the same cancellation.
#[derive(Clone, Debug)]
pub struct CancelSignal(CancellationToken);

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-job execution context the worker pool hands to the downloader
/// adapter (§4.E inputs): cancellation, timing limits, and the already
/// path-validated output location.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub cancel_signal: CancelSignal,
    pub deadline: Option<Duration>,
    /// No progress observed within this window is a `STALL_TIMEOUT` (§4.E).
    pub stall_timeout: Option<Duration>,
    /// Absolute output path, already expanded and confined to the storage
    /// root by the admission layer — the adapter never builds this itself.
    pub output_path: PathBuf,
    pub credential_plaintext_path: Option<Arc<PathBuf>>,
}

/// The full, concurrency-safe job record (§3.1). Owned exclusively by the Job
/// Store; every mutation goes through a store-mediated transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub payload: JobPayload,
    pub parent_batch_id: Option<BatchId>,
    pub progress: Progress,
    pub result: Option<JobResult>,
    pub error: Option<JobFailure>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip)]
    pub logs: Vec<LogEntry>,
    #[serde(skip)]
    pub cancel_signal: CancelSignal,
}

impl Job {
    #[must_use]
    pub fn new(kind: JobKind, payload: JobPayload, parent_batch_id: Option<BatchId>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            state: JobState::Queued,
            payload,
            parent_batch_id,
            progress: Progress::default(),
            result: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            logs: Vec::new(),
            cancel_signal: CancelSignal::new(),
        }
    }

    /// A read-only snapshot suitable for `GET /api/v1/download/{id}` (§6).
    /// Identical to `Job` minus the log buffer and cancel handle, which are
    /// fetched/observed separately.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self {
            logs: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_queued_with_no_result_or_error() {
        let job = Job::new(JobKind::Single, JobPayload::new("https://example.test/v/1"), None);
        assert_eq!(job.state, JobState::Queued);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn terminal_states_are_recognized() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn cancel_signal_is_observed_across_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());
        signal.cancel();
        assert!(clone.is_cancelled());
    }
}
