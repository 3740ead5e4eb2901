//! Axum server bootstrap — the composition root (§4.J).
//!
//! This module is the ONLY place where infrastructure is wired together:
//! the vault, retention scheduler, webhook notifier, downloader adapter,
//! metadata inspector, Job Store, worker pool, batch coordinator and rate
//! limiter are all constructed here from a single [`Config`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use ytd_adapter::{YtDlpAdapter, YtDlpInspector};
use ytd_core::{
    BatchState, Config, CredentialVaultPort, DownloaderAdapterPort, JobId, MetadataExtractorPort,
    RetentionSchedulerPort, WebhookEvent, WebhookEventKind, WebhookSenderPort,
};
use ytd_engine::{BatchCoordinator, JobStore, WorkerPool, WorkerPoolConfig};
use ytd_retention::RetentionScheduler;
use ytd_vault::FileVault;
use ytd_webhook::WebhookNotifier;

use crate::rate_limit::{build_limiter, KeyedLimiter};

/// Stands in for [`WebhookNotifier`] when `WEBHOOK_ENABLE=false`: every job
/// still produces the same lifecycle events, they're just dropped here
/// instead of being delivered.
struct NullWebhookSender;

#[async_trait]
impl WebhookSenderPort for NullWebhookSender {
    async fn send(&self, _url: String, _event: WebhookEvent) {}
}

/// Application context for the Axum adapter: the config and every port
/// handlers reach through to act on a job, batch or credential.
pub struct AxumContext {
    pub config: Config,
    pub job_store: Arc<JobStore>,
    pub worker_pool: WorkerPool,
    pub batch_coordinator: BatchCoordinator,
    pub vault: Arc<dyn CredentialVaultPort>,
    pub retention: Arc<dyn RetentionSchedulerPort>,
    pub webhook: Arc<dyn WebhookSenderPort>,
    pub downloader: Arc<dyn DownloaderAdapterPort>,
    pub inspector: Arc<dyn MetadataExtractorPort>,
    pub rate_limiter: Arc<KeyedLimiter>,
}

/// Wires every component named by `config` and starts the worker pool's
/// background tasks. The returned [`JoinHandle`]s must be passed to
/// `WorkerPool::shutdown` during graceful shutdown.
pub async fn bootstrap(config: Config) -> Result<(AxumContext, Vec<JoinHandle<()>>)> {
    tokio::fs::create_dir_all(&config.storage_dir).await?;
    tokio::fs::create_dir_all(config.cookies_dir()).await?;

    let vault: Arc<dyn CredentialVaultPort> = Arc::new(
        FileVault::new(config.cookies_dir(), config.cookie_encryption_key.as_deref()).await?,
    );

    let retention: Arc<dyn RetentionSchedulerPort> =
        Arc::new(RetentionScheduler::start(config.storage_dir.clone()));

    let webhook: Arc<dyn WebhookSenderPort> = if config.webhook_enable {
        let secret = config.webhook_secret.clone().unwrap_or_else(|| {
            tracing::warn!(
                "WEBHOOK_ENABLE is set but WEBHOOK_SECRET is not configured; \
                 signatures will use an unstable per-process default"
            );
            uuid::Uuid::new_v4().to_string()
        });
        Arc::new(WebhookNotifier::new(
            secret,
            config.webhook_max_retries,
            std::time::Duration::from_secs(config.webhook_timeout_sec),
        ))
    } else {
        Arc::new(NullWebhookSender)
    };

    let downloader: Arc<dyn DownloaderAdapterPort> = Arc::new(YtDlpAdapter::new("yt-dlp"));
    let inspector: Arc<dyn MetadataExtractorPort> = Arc::new(YtDlpInspector::new("yt-dlp"));

    let job_store = Arc::new(JobStore::new());
    let pool_config = WorkerPoolConfig {
        workers: config.workers,
        max_concurrent: config.max_concurrent_downloads,
        queue_bound: config.queue_bound,
        default_timeout: Some(std::time::Duration::from_secs(config.default_timeout_sec)),
    };
    let (worker_pool, handles) = WorkerPool::start(job_store.clone(), pool_config);
    let batch_coordinator = BatchCoordinator::new(job_store.clone(), worker_pool.clone());

    let rate_limiter = build_limiter(config.rate_limit_rps, config.rate_limit_burst);

    spawn_batch_webhook_relay(batch_coordinator.clone(), job_store.clone(), webhook.clone());

    let ctx = AxumContext {
        config,
        job_store,
        worker_pool,
        batch_coordinator,
        vault,
        retention,
        webhook,
        downloader,
        inspector,
        rate_limiter,
    };

    Ok((ctx, handles))
}

/// Relays batch-terminal notifications onto the webhook port (§4.D's
/// "batch/channel analogues" of the single-job lifecycle events).
///
/// The batch itself carries no `webhook_url` of its own (§6's
/// `CreateBatchRequest` has none); a batch's children are always created
/// from the same request, so the first child with one set stands in for the
/// whole batch.
fn spawn_batch_webhook_relay(
    coordinator: BatchCoordinator,
    job_store: Arc<JobStore>,
    webhook: Arc<dyn WebhookSenderPort>,
) {
    let mut terminal_rx = coordinator.subscribe_terminal();
    tokio::spawn(async move {
        loop {
            let (batch_id, state) = match terminal_rx.recv().await {
                Ok(msg) => msg,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let Some(batch) = coordinator.status(batch_id).await else {
                continue;
            };

            let mut webhook_url = None;
            for child_id in &batch.child_ids {
                if let Some(job) = job_store.get(*child_id).await {
                    if let Some(url) = job.payload.webhook_url.clone() {
                        webhook_url = Some(url);
                        break;
                    }
                }
            }
            let Some(url) = webhook_url else { continue };

            let kind = match state {
                BatchState::Completed => WebhookEventKind::BatchCompleted,
                BatchState::Failed => WebhookEventKind::BatchFailed,
                BatchState::Running => continue,
            };
            let data = serde_json::json!({
                "batch_id": batch_id,
                "counts": batch.counts,
                "overall_percent": batch.overall_percent,
            });
            let event = WebhookEvent::new(kind, JobId::from_uuid(batch_id.as_uuid()), data);
            webhook.send(url, event).await;
        }
    });
}
