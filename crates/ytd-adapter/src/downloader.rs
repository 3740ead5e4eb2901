//! The yt-dlp-backed implementation of [`DownloaderAdapterPort`] (§4.E).

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use ytd_core::{
    AdapterProgress, CoreError, DownloaderAdapterPort, JobContext, JobId, JobPayload, JobResult,
    LogEntry, LogLevel, ProgressSink,
};

use crate::argv::{build_args, PROGRESS_MARKER};
use crate::process::shutdown::shutdown_child;
use crate::process::stream::{spawn_stream_reader, StreamLine};

/// Wall-clock ceiling applied when neither the job nor the configuration
/// supplies a deadline (§5: no job may run forever).
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Deserialize)]
struct RawProgress {
    downloaded_bytes: Option<u64>,
    total_bytes: Option<u64>,
    speed: Option<f64>,
    eta: Option<u64>,
    playlist_index: Option<u64>,
    playlist_count: Option<u64>,
}

pub struct YtDlpAdapter {
    binary_path: PathBuf,
}

impl YtDlpAdapter {
    #[must_use]
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

impl Default for YtDlpAdapter {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

fn parse_progress_line(line: &str) -> Option<AdapterProgress> {
    let payload = line.strip_prefix(PROGRESS_MARKER)?;
    let raw: RawProgress = serde_json::from_str(payload.trim()).ok()?;
    Some(AdapterProgress::Downloading {
        downloaded: raw.downloaded_bytes.unwrap_or(0),
        total: raw.total_bytes,
        speed_bps: raw.speed,
        eta_sec: raw.eta,
        item_index: raw.playlist_index,
        item_count: raw.playlist_count,
    })
}

#[async_trait]
impl DownloaderAdapterPort for YtDlpAdapter {
    async fn run(
        &self,
        job_id: JobId,
        payload: JobPayload,
        context: JobContext,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobResult, CoreError> {
        let kind = if payload.item_range.is_some() || payload.max_downloads.is_some() {
            ytd_core::JobKind::Playlist
        } else {
            ytd_core::JobKind::Single
        };
        let cookies_path = context
            .credential_plaintext_path
            .as_ref()
            .map(|p| p.as_path());
        let args = build_args(kind, &payload, &context.output_path, cookies_path);

        debug!(job_id = %job_id, args = ?args, "spawning downloader");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::SubprocessSpawnFailed(e.to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel::<StreamLine>();
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, "stdout", tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, "stderr", tx.clone());
        }
        drop(tx);

        let stall_timeout = context.stall_timeout.unwrap_or(DEFAULT_STALL_TIMEOUT);
        let mut last_progress = Instant::now();
        let mut stall_check = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                biased;

                () = context.cancel_signal.cancelled() => {
                    warn!(job_id = %job_id, "cancellation requested, shutting down downloader");
                    let _ = shutdown_child(child).await;
                    remove_partial_output(&context.output_path).await;
                    return Err(CoreError::Cancelled);
                }

                line = rx.recv() => {
                    match line {
                        Some(line) => handle_line(&job_id, &line, &sink, &mut last_progress).await,
                        None => break,
                    }
                }

                _ = stall_check.tick() => {
                    if last_progress.elapsed() >= stall_timeout {
                        warn!(job_id = %job_id, secs = stall_timeout.as_secs(), "no progress observed, treating as stalled");
                        let _ = shutdown_child(child).await;
                        remove_partial_output(&context.output_path).await;
                        return Err(CoreError::StallTimeout(stall_timeout.as_secs()));
                    }
                }
            }
        }

        let status = match context.deadline {
            Some(deadline) => match timeout(deadline, child.wait()).await {
                Ok(result) => result.map_err(|e| CoreError::Internal(e.to_string()))?,
                Err(_) => {
                    let _ = shutdown_child(child).await;
                    remove_partial_output(&context.output_path).await;
                    return Err(CoreError::Timeout);
                }
            },
            None => child.wait().await.map_err(|e| CoreError::Internal(e.to_string()))?,
        };

        if !status.success() {
            return Err(CoreError::SubprocessNonzeroExit(status.code().unwrap_or(-1)));
        }

        sink.on_progress(AdapterProgress::Finished).await;
        resolve_output(&context.output_path).await
    }
}

async fn handle_line(
    job_id: &JobId,
    line: &StreamLine,
    sink: &Arc<dyn ProgressSink>,
    last_progress: &mut Instant,
) {
    if let Some(progress) = parse_progress_line(&line.text) {
        *last_progress = Instant::now();
        sink.on_progress(progress).await;
        return;
    }

    let level = if line.stream == "stderr" {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    debug!(job_id = %job_id, stream = line.stream, "{}", line.text);
    sink.on_log(LogEntry::new(level, line.text.clone())).await;
}

async fn remove_partial_output(output_path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(output_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %output_path.display(), error = %e, "failed to remove partial output");
        }
    }
}

async fn resolve_output(output_path: &std::path::Path) -> Result<JobResult, CoreError> {
    let meta = tokio::fs::metadata(output_path)
        .await
        .map_err(|_| CoreError::OutputMissing(output_path.display().to_string()))?;

    Ok(JobResult {
        relative_path: output_path.display().to_string(),
        size_bytes: meta.len(),
        title: None,
        duration_sec: None,
        format: output_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string),
        deletion_instant: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_marker_line() {
        let line = format!(
            "{PROGRESS_MARKER}{{\"downloaded_bytes\": 100, \"total_bytes\": 200, \"speed\": 5.0, \"eta\": 10}}"
        );
        let progress = parse_progress_line(&line).unwrap();
        match progress {
            AdapterProgress::Downloading { downloaded, total, .. } => {
                assert_eq!(downloaded, 100);
                assert_eq!(total, Some(200));
            }
            AdapterProgress::Finished => panic!("expected Downloading"),
        }
    }

    #[test]
    fn ignores_unrelated_output_lines() {
        assert!(parse_progress_line("[download] Destination: video.mp4").is_none());
    }
}
