//! Batch Coordinator (§4.H): fans a batch out into single-kind children,
//! gates their concurrency independently of the pool's global cap, and
//! aggregates their outcomes into a batch-level terminal state.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{broadcast, Mutex, RwLock, Semaphore};
use ytd_core::{Batch, BatchCounts, BatchId, BatchPolicy, BatchState, CoreError, JobId, JobKind, JobPayload};

use crate::job_store::{JobFilter, JobStore};
use crate::queue::{JobCallback, JobOutcome, WorkerPool};

const MAX_BATCH_SIZE: usize = 100;
const MAX_CONCURRENCY_CAP: u32 = 10;

/// The Batch Coordinator (§4.H).
#[derive(Clone)]
pub struct BatchCoordinator {
    store: Arc<JobStore>,
    pool: WorkerPool,
    batches: Arc<RwLock<IndexMap<BatchId, Arc<Mutex<Batch>>>>>,
    terminal_tx: broadcast::Sender<(BatchId, BatchState)>,
}

impl BatchCoordinator {
    #[must_use]
    pub fn new(store: Arc<JobStore>, pool: WorkerPool) -> Self {
        let (terminal_tx, _) = broadcast::channel(64);
        Self {
            store,
            pool,
            batches: Arc::new(RwLock::new(IndexMap::new())),
            terminal_tx,
        }
    }

    /// Fires `(batch_id, terminal_state)` once per batch, when every child
    /// has reached a terminal state (§4.H step 6).
    #[must_use]
    pub fn subscribe_terminal(&self) -> broadcast::Receiver<(BatchId, BatchState)> {
        self.terminal_tx.subscribe()
    }

    /// Validates inputs, creates the batch and its children, and dispatches
    /// each child through the worker pool gated by `concurrency_cap`.
    ///
    /// `make_child_callback` builds the per-child execution logic (it
    /// receives the child's index into `payloads` so the caller can pick the
    /// matching URL's resolved output path/credential).
    pub async fn create_batch(
        &self,
        payloads: Vec<JobPayload>,
        policy: BatchPolicy,
        concurrency_cap: u32,
        make_child_callback: impl Fn(usize, JobId) -> JobCallback,
    ) -> Result<BatchId, CoreError> {
        if payloads.is_empty() || payloads.len() > MAX_BATCH_SIZE {
            return Err(CoreError::Validation(format!(
                "batch must contain 1 to {MAX_BATCH_SIZE} urls, got {}",
                payloads.len()
            )));
        }
        if concurrency_cap == 0 || concurrency_cap > MAX_CONCURRENCY_CAP {
            return Err(CoreError::Validation(format!(
                "concurrency_cap must be 1 to {MAX_CONCURRENCY_CAP}, got {concurrency_cap}"
            )));
        }

        let batch_id = BatchId::new();
        let mut child_ids = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            let id = self
                .store
                .create(JobKind::BatchChild, payload.clone(), Some(batch_id))
                .await;
            child_ids.push(id);
        }

        let mut counts = BatchCounts::default();
        counts.queued = u32::try_from(child_ids.len()).unwrap_or(u32::MAX);
        let batch = Batch {
            id: batch_id,
            child_ids: child_ids.clone(),
            policy,
            concurrency_cap,
            state: BatchState::Running,
            counts,
            overall_percent: 0.0,
            created_at: chrono::Utc::now(),
            completed_at: None,
        };
        self.batches
            .write()
            .await
            .insert(batch_id, Arc::new(Mutex::new(batch)));

        let gate = Arc::new(Semaphore::new(concurrency_cap as usize));
        for (index, child_id) in child_ids.iter().copied().enumerate() {
            let inner = make_child_callback(index, child_id);
            let wrapped = self.wrap_child_callback(batch_id, gate.clone(), inner);
            self.pool.enqueue(child_id, wrapped).await?;
        }

        Ok(batch_id)
    }

    fn wrap_child_callback(
        &self,
        batch_id: BatchId,
        gate: Arc<Semaphore>,
        inner: JobCallback,
    ) -> JobCallback {
        let coordinator = self.clone();
        Arc::new(move |job, ctx| {
            let gate = gate.clone();
            let inner = inner.clone();
            let coordinator = coordinator.clone();
            Box::pin(async move {
                let permit = gate.acquire_owned().await;
                let outcome = inner(job, ctx).await;
                drop(permit);
                coordinator.on_child_terminal(batch_id, &outcome).await;
                outcome
            })
        })
    }

    async fn on_child_terminal(&self, batch_id: BatchId, outcome: &JobOutcome) {
        let Some(record) = self.batches.read().await.get(&batch_id).cloned() else {
            return;
        };

        let (should_stop, is_complete, terminal_state) = {
            let mut batch = record.lock().await;
            batch.counts = self.recompute_counts(&batch).await;
            batch.overall_percent = self.recompute_percent(&batch).await;

            let should_stop =
                matches!(batch.policy, BatchPolicy::StopOnError) && matches!(outcome, JobOutcome::Failed(_));
            let is_complete = batch.is_complete();
            if is_complete {
                batch.state = batch.terminal_state();
                batch.completed_at = Some(chrono::Utc::now());
            }
            (should_stop, is_complete, batch.state)
        };

        if should_stop {
            self.cancel_queued_children(batch_id).await;
        }
        if is_complete {
            let _ = self.terminal_tx.send((batch_id, terminal_state));
        }
    }

    async fn recompute_counts(&self, batch: &Batch) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for id in &batch.child_ids {
            if let Some(job) = self.store.get(*id).await {
                counts.record(job.state);
            }
        }
        counts
    }

    async fn recompute_percent(&self, batch: &Batch) -> f64 {
        let total = batch.child_ids.len();
        if total == 0 {
            return 100.0;
        }
        let mut sum = 0.0;
        for id in &batch.child_ids {
            if let Some(job) = self.store.get(*id).await {
                sum += if job.state == ytd_core::JobState::Completed {
                    100.0
                } else {
                    job.progress.percent
                };
            }
        }
        #[expect(clippy::cast_precision_loss, reason = "batch sizes are bounded well under f64 precision")]
        let percent = sum / total as f64;
        percent.clamp(0.0, 100.0)
    }

    async fn cancel_queued_children(&self, batch_id: BatchId) {
        let queued = self
            .store
            .list(&JobFilter {
                state: Some(ytd_core::JobState::Queued),
                kind: None,
                parent_batch_id: Some(batch_id),
            })
            .await;
        for job in queued {
            let _ = self.pool.cancel(job.id).await;
        }
    }

    /// A read-only snapshot of the batch, or `None` if unknown.
    pub async fn status(&self, batch_id: BatchId) -> Option<Batch> {
        let record = self.batches.read().await.get(&batch_id).cloned()?;
        let batch = record.lock().await;
        Some(batch.clone())
    }

    /// Cancels every non-terminal child; the batch will reach its terminal
    /// state as those cancellations (or in-flight completions) land.
    pub async fn cancel(&self, batch_id: BatchId) -> Result<(), CoreError> {
        let Some(batch) = self.status(batch_id).await else {
            return Err(CoreError::NotFound(batch_id.to_string()));
        };
        for id in batch.child_ids {
            let _ = self.pool.cancel(id).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WorkerPoolConfig;
    use std::time::Duration;
    use ytd_core::JobResult;

    fn payloads(n: usize) -> Vec<JobPayload> {
        (0..n)
            .map(|i| JobPayload::new(format!("https://example.test/v/{i}")))
            .collect()
    }

    fn completing_callback() -> JobCallback {
        Arc::new(|_job, _ctx| {
            Box::pin(async move {
                JobOutcome::Completed(JobResult {
                    relative_path: "out".into(),
                    size_bytes: 1,
                    title: None,
                    duration_sec: None,
                    format: None,
                    deletion_instant: None,
                })
            })
        })
    }

    #[tokio::test]
    async fn batch_completes_when_all_children_complete() {
        let store = Arc::new(JobStore::new());
        let (pool, handles) = WorkerPool::start(
            store.clone(),
            WorkerPoolConfig {
                workers: 2,
                max_concurrent: 2,
                queue_bound: 16,
                default_timeout: None,
            },
        );
        let coordinator = BatchCoordinator::new(store, pool.clone());
        let mut terminal = coordinator.subscribe_terminal();

        let batch_id = coordinator
            .create_batch(payloads(3), BatchPolicy::ContinueOnError, 2, |_idx, _id| {
                completing_callback()
            })
            .await
            .unwrap();

        let (got_id, state) = tokio::time::timeout(Duration::from_secs(2), terminal.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got_id, batch_id);
        assert_eq!(state, BatchState::Completed);

        pool.shutdown(Duration::from_millis(0), handles).await;
    }

    #[tokio::test]
    async fn invalid_concurrency_cap_is_rejected() {
        let store = Arc::new(JobStore::new());
        let (pool, _handles) = WorkerPool::start(
            store.clone(),
            WorkerPoolConfig {
                workers: 1,
                max_concurrent: 1,
                queue_bound: 16,
                default_timeout: None,
            },
        );
        let coordinator = BatchCoordinator::new(store, pool);
        let err = coordinator
            .create_batch(payloads(1), BatchPolicy::ContinueOnError, 11, |_idx, _id| {
                completing_callback()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let store = Arc::new(JobStore::new());
        let (pool, _handles) = WorkerPool::start(
            store.clone(),
            WorkerPoolConfig {
                workers: 1,
                max_concurrent: 1,
                queue_bound: 16,
                default_timeout: None,
            },
        );
        let coordinator = BatchCoordinator::new(store, pool);
        let err = coordinator
            .create_batch(vec![], BatchPolicy::ContinueOnError, 1, |_idx, _id| {
                completing_callback()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
