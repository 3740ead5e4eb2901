//! Wires a queued [`Job`] to the downloader adapter: output path resolution,
//! credential issuance, progress/log propagation into the Job Store, webhook
//! notification and post-completion retention scheduling (§2 control flow,
//! §4.E, §4.F).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;
use ytd_core::{
    AdapterProgress, CoreError, CredentialVaultPort, DownloaderAdapterPort, Job, JobContext,
    JobFailure, JobId, JobKind, JobPayload, LogEntry, MetadataExtractorPort, Progress,
    RetentionSchedulerPort, TemplateFields, WebhookEvent, WebhookEventKind, WebhookSenderPort,
    expand_output_template, sanitize_filename_component,
};
use ytd_engine::{BoxFuture, JobCallback, JobOutcome, JobStore, WorkerContext};

const DEFAULT_TEMPLATE: &str = "{safe_title}.{ext}";

fn guess_extension(payload: &JobPayload) -> String {
    if payload.audio_only {
        payload.format.clone().unwrap_or_else(|| "m4a".to_string())
    } else {
        payload
            .format
            .clone()
            .filter(|f| f.len() <= 4 && f.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "mp4".to_string())
    }
}

/// Builds the job's destination path, always nested under
/// `downloads/{job_id}/` so a hostile `path_template` can never escape the
/// storage root regardless of what it contains — every path segment is run
/// through [`sanitize_filename_component`] individually.
fn build_relative_output_path(
    job_id: JobId,
    payload: &JobPayload,
    title: Option<&str>,
    uploader: Option<&str>,
    date: Option<&str>,
) -> PathBuf {
    let ext = guess_extension(payload);
    let fields = TemplateFields {
        id: &job_id.to_string(),
        title: title.unwrap_or("download"),
        ext: &ext,
        uploader,
        date,
        playlist: None,
        playlist_index: None,
    };
    let random = Uuid::new_v4().to_string();
    let template = payload.path_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let expanded = expand_output_template(template, &fields, &random);

    let sanitized: PathBuf = expanded
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_filename_component)
        .collect();

    Path::new("downloads").join(job_id.to_string()).join(sanitized)
}

struct HttpProgressSink {
    store: Arc<JobStore>,
    webhook: Arc<dyn WebhookSenderPort>,
    job_id: JobId,
    job_kind: JobKind,
    webhook_url: Option<String>,
}

#[async_trait]
impl ytd_core::ProgressSink for HttpProgressSink {
    async fn on_progress(&self, progress: AdapterProgress) {
        let snapshot = match progress {
            AdapterProgress::Downloading {
                downloaded,
                total,
                speed_bps,
                item_index,
                item_count,
                ..
            } => {
                if matches!(self.job_kind, JobKind::Playlist | JobKind::Channel) {
                    // Items-based (§2 Open Question, resolved in DESIGN.md):
                    // `item_index` is the entry currently in flight, so the
                    // entries strictly before it are the completed count.
                    let completed = item_index.unwrap_or(0).saturating_sub(1);
                    Progress::from_items(completed, item_count.unwrap_or(0))
                } else {
                    Progress::from_bytes(downloaded, total.unwrap_or(0), speed_bps.unwrap_or(0.0))
                }
            }
            AdapterProgress::Finished => Progress::complete(),
        };
        self.store.patch_progress(self.job_id, snapshot).await;

        if let Some(url) = &self.webhook_url {
            let data = serde_json::json!({
                "percent": snapshot.percent,
                "downloaded_bytes": snapshot.downloaded_bytes,
                "total_bytes": snapshot.total_bytes,
            });
            let event = WebhookEvent::new(WebhookEventKind::DownloadProgress, self.job_id, data);
            self.webhook.send(url.clone(), event).await;
        }
    }

    async fn on_log(&self, entry: LogEntry) {
        self.store
            .append_log(self.job_id, entry.level, entry.message)
            .await;
    }
}

/// Dependencies a dispatched job callback closes over.
pub struct DispatchDeps {
    pub store: Arc<JobStore>,
    pub downloader: Arc<dyn DownloaderAdapterPort>,
    pub inspector: Arc<dyn MetadataExtractorPort>,
    pub vault: Arc<dyn CredentialVaultPort>,
    pub retention: Arc<dyn RetentionSchedulerPort>,
    pub webhook: Arc<dyn WebhookSenderPort>,
    pub storage_dir: PathBuf,
    pub file_retention_hours: u64,
    pub default_stall_timeout_sec: u64,
}

/// Builds the [`JobCallback`] the worker pool invokes once a job is
/// dequeued. Shared by single, playlist, channel and batch-child downloads —
/// they differ only in the payload and job kind the store already recorded.
#[must_use]
pub fn build_job_callback(deps: Arc<DispatchDeps>) -> JobCallback {
    Arc::new(move |job: Job, ctx: WorkerContext| {
        let deps = deps.clone();
        Box::pin(run_job(deps, job, ctx)) as BoxFuture<'static, JobOutcome>
    })
}

async fn run_job(deps: Arc<DispatchDeps>, job: Job, ctx: WorkerContext) -> JobOutcome {
    let payload = job.payload.clone();

    if let Some(url) = &payload.webhook_url {
        let event = WebhookEvent::new(
            WebhookEventKind::DownloadStarted,
            job.id,
            serde_json::json!({ "url": payload.url }),
        );
        deps.webhook.send(url.clone(), event).await;
    }

    let metadata = deps.inspector.metadata(&payload.url).await.ok();
    let relative_path = build_relative_output_path(
        job.id,
        &payload,
        metadata.as_ref().map(|m| m.title.as_str()),
        metadata.as_ref().and_then(|m| m.uploader.as_deref()),
        metadata.as_ref().and_then(|m| m.upload_date.as_deref()),
    );
    let output_path = deps.storage_dir.join(&relative_path);
    if let Some(parent) = output_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return fail(&deps, &job, payload.webhook_url.as_deref(), CoreError::Internal(format!(
                "failed to create output directory: {e}"
            )))
            .await;
        }
    }

    let credential_plaintext_path = match payload.cookies_id {
        Some(id) => match deps.vault.issue_plaintext(id).await {
            Ok(path) => Some(Arc::new(path)),
            Err(e) => return fail(&deps, &job, payload.webhook_url.as_deref(), e).await,
        },
        None => None,
    };

    let job_context = JobContext {
        job_id: job.id,
        cancel_signal: ctx.cancel_signal,
        deadline: ctx.deadline,
        stall_timeout: Some(std::time::Duration::from_secs(deps.default_stall_timeout_sec)),
        output_path: output_path.clone(),
        credential_plaintext_path: credential_plaintext_path.clone(),
    };

    let sink = Arc::new(HttpProgressSink {
        store: deps.store.clone(),
        webhook: deps.webhook.clone(),
        job_id: job.id,
        job_kind: job.kind,
        webhook_url: payload.webhook_url.clone(),
    });

    let result = deps
        .downloader
        .run(job.id, payload.clone(), job_context, sink)
        .await;

    if let Some(path) = credential_plaintext_path {
        deps.vault.release_plaintext(&path).await;
    }

    match result {
        Ok(mut job_result) => {
            job_result.relative_path = relative_path.display().to_string();
            job_result.title = metadata.as_ref().map(|m| m.title.clone());
            job_result.duration_sec = metadata.as_ref().and_then(|m| m.duration_sec);
            let deletion_at =
                chrono::Utc::now() + chrono::Duration::hours(deps.file_retention_hours as i64);
            job_result.deletion_instant = Some(deletion_at);
            deps.retention
                .schedule_deletion(output_path.clone(), deletion_at)
                .await;

            if let Some(url) = &payload.webhook_url {
                let event = WebhookEvent::new(
                    WebhookEventKind::DownloadCompleted,
                    job.id,
                    serde_json::json!({ "relative_path": job_result.relative_path }),
                );
                deps.webhook.send(url.clone(), event).await;
            }
            JobOutcome::Completed(job_result)
        }
        Err(CoreError::Cancelled) => JobOutcome::Cancelled,
        Err(e) => fail(&deps, &job, payload.webhook_url.as_deref(), e).await,
    }
}

async fn fail(
    deps: &Arc<DispatchDeps>,
    job: &Job,
    webhook_url: Option<&str>,
    err: CoreError,
) -> JobOutcome {
    warn!(job_id = %job.id, error = %err, "job failed");
    let failure = JobFailure::from(&err);
    if let Some(url) = webhook_url {
        let event = WebhookEvent::new(
            WebhookEventKind::DownloadFailed,
            job.id,
            serde_json::json!({ "code": failure.code, "message": failure.message }),
        );
        deps.webhook.send(url.to_string(), event).await;
    }
    JobOutcome::Failed(failure)
}
