//! Progress tracking, log buffers and webhook event payloads.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// A job's current progress, as stored on its record (§3.1).
///
/// `percent` is monotonically non-decreasing within a state; it is exactly
/// `100.0` iff the job is `COMPLETED`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub percent: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed_bps: f64,
    pub eta_sec: Option<f64>,
}

impl Progress {
    #[must_use]
    pub fn from_bytes(downloaded: u64, total: u64, speed_bps: f64) -> Self {
        let percent = if total > 0 {
            #[expect(
                clippy::cast_precision_loss,
                reason = "progress percentage tolerates float imprecision"
            )]
            let p = (downloaded as f64 / total as f64) * 100.0;
            p.clamp(0.0, 100.0)
        } else {
            0.0
        };

        let eta_sec = if speed_bps > 0.0 && total > downloaded {
            #[expect(clippy::cast_precision_loss, reason = "same as above")]
            let eta = (total - downloaded) as f64 / speed_bps;
            Some(eta)
        } else {
            None
        };

        Self {
            percent,
            downloaded_bytes: downloaded,
            total_bytes: total,
            speed_bps,
            eta_sec,
        }
    }

    /// Items-based progress for playlist/channel jobs (§2 Open Question,
    /// resolved in DESIGN.md): percent is `completed / total` rather than
    /// byte-based.
    #[must_use]
    pub fn from_items(completed: u64, total: u64) -> Self {
        let percent = if total > 0 {
            #[expect(clippy::cast_precision_loss, reason = "progress percentage")]
            let p = (completed as f64 / total as f64) * 100.0;
            p.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            percent,
            downloaded_bytes: completed,
            total_bytes: total,
            speed_bps: 0.0,
            eta_sec: None,
        }
    }

    #[must_use]
    pub const fn complete() -> Self {
        Self {
            percent: 100.0,
            downloaded_bytes: 0,
            total_bytes: 0,
            speed_bps: 0.0,
            eta_sec: None,
        }
    }
}

/// Severity of a log line appended to a job's bounded log buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single line in a job's append-only, bounded log buffer (§4.F).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            ts: chrono::Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// An adapter-reported progress update, streamed from the downloader adapter
/// back to the worker that owns the job (§4.E).
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterProgress {
    Downloading {
        downloaded: u64,
        total: Option<u64>,
        speed_bps: Option<f64>,
        eta_sec: Option<f64>,
        /// 1-based index of the playlist/channel entry currently in
        /// flight, when yt-dlp reports one (§2 Open Question: item-based
        /// progress basis for multi-file jobs).
        item_index: Option<u64>,
        item_count: Option<u64>,
    },
    Finished,
}

/// The kind of lifecycle event delivered to the webhook notifier (§4.D).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    DownloadStarted,
    DownloadProgress,
    DownloadCompleted,
    DownloadFailed,
    BatchCompleted,
    BatchFailed,
}

impl WebhookEventKind {
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::DownloadStarted => "download.started",
            Self::DownloadProgress => "download.progress",
            Self::DownloadCompleted => "download.completed",
            Self::DownloadFailed => "download.failed",
            Self::BatchCompleted => "batch.completed",
            Self::BatchFailed => "batch.failed",
        }
    }

    /// Progress events are throttled per-job; every other event type is
    /// delivered unconditionally (§4.D).
    #[must_use]
    pub const fn is_throttleable(self) -> bool {
        matches!(self, Self::DownloadProgress)
    }
}

/// The full webhook request body (§6): `{event, timestamp, job_id, data}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: WebhookEventKind,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub job_id: JobId,
    pub data: serde_json::Value,
}

impl WebhookEvent {
    #[must_use]
    pub fn new(event: WebhookEventKind, job_id: JobId, data: serde_json::Value) -> Self {
        Self {
            event,
            timestamp: chrono::Utc::now(),
            job_id,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_progress_calculations() {
        let p = Progress::from_bytes(500, 1000, 100.0);
        assert!((p.percent - 50.0).abs() < 0.01);
        assert!((p.eta_sec.unwrap() - 5.0).abs() < 0.01);
    }

    #[test]
    fn zero_total_does_not_divide_by_zero() {
        let p = Progress::from_bytes(0, 0, 0.0);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.eta_sec, None);
    }

    #[test]
    fn items_progress_basis_for_playlists() {
        let p = Progress::from_items(3, 10);
        assert!((p.percent - 30.0).abs() < 0.01);
    }

    #[test]
    fn progress_webhooks_are_throttleable_but_terminal_events_are_not() {
        assert!(WebhookEventKind::DownloadProgress.is_throttleable());
        assert!(!WebhookEventKind::DownloadCompleted.is_throttleable());
        assert!(!WebhookEventKind::DownloadFailed.is_throttleable());
    }
}
