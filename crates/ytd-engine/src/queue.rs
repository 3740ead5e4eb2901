//! Bounded FIFO queue and worker pool (§4.G).
//!
//! Workers pull job ids from a bounded `mpsc` channel — the channel's bound
//! *is* the queue depth, so a full channel naturally rejects admission with
//! `QUEUE_FULL` rather than growing without limit.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use ytd_core::{
    BatchId, CancelSignal, CoreError, Job, JobFailure, JobId, JobKind, JobPayload, JobResult,
    JobState,
};

use crate::job_store::JobStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal disposition a callback reports for the job it ran (§4.G).
#[derive(Debug)]
pub enum JobOutcome {
    Completed(JobResult),
    Failed(JobFailure),
    Cancelled,
}

/// Per-job execution context handed to a [`JobCallback`]: cancellation and
/// timing only — path resolution and credential handling are the caller's
/// concern, baked into the callback closure itself at submission time.
#[derive(Clone)]
pub struct WorkerContext {
    pub job_id: JobId,
    pub cancel_signal: CancelSignal,
    pub deadline: Option<Duration>,
}

/// A job's execution logic, supplied at `submit`/`enqueue` time. Captures
/// whatever the caller already resolved (output path, credential, adapter,
/// webhook sender) and returns the job's terminal outcome.
pub type JobCallback = Arc<dyn Fn(Job, WorkerContext) -> BoxFuture<'static, JobOutcome> + Send + Sync>;

/// Configuration for [`WorkerPool::start`].
#[derive(Clone, Copy, Debug)]
pub struct WorkerPoolConfig {
    pub workers: u32,
    pub max_concurrent: u32,
    pub queue_bound: u32,
    pub default_timeout: Option<Duration>,
}

struct Inner {
    store: Arc<JobStore>,
    tx: mpsc::Sender<JobId>,
    callbacks: Mutex<HashMap<JobId, JobCallback>>,
    max_concurrent: Arc<Semaphore>,
    default_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

/// The queue and worker pool (§4.G, §5).
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Spawns `config.workers` worker tasks pulling from a bounded queue of
    /// depth `config.queue_bound`, gated by a `max_concurrent` semaphore.
    #[must_use]
    pub fn start(store: Arc<JobStore>, config: WorkerPoolConfig) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(config.queue_bound as usize);
        let inner = Arc::new(Inner {
            store,
            tx,
            callbacks: Mutex::new(HashMap::new()),
            max_concurrent: Arc::new(Semaphore::new(config.max_concurrent as usize)),
            default_timeout: config.default_timeout,
            shutdown: CancellationToken::new(),
        });

        let rx = Arc::new(Mutex::new(rx));
        let mut handles = Vec::new();
        for worker_id in 0..config.workers {
            let inner = inner.clone();
            let rx = rx.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, inner, rx).await;
            }));
        }

        (Self { inner }, handles)
    }

    /// Creates a `QUEUED` job and enqueues it. Rejects with `QUEUE_FULL` if
    /// the bounded queue is already at capacity.
    pub async fn submit(
        &self,
        kind: JobKind,
        payload: JobPayload,
        parent_batch_id: Option<BatchId>,
        callback: JobCallback,
    ) -> Result<JobId, CoreError> {
        let id = self.inner.store.create(kind, payload, parent_batch_id).await;
        self.enqueue(id, callback).await?;
        Ok(id)
    }

    /// Enqueues a job that already exists in the store (used by the batch
    /// coordinator, which assigns child ids up front).
    pub async fn enqueue(&self, id: JobId, callback: JobCallback) -> Result<(), CoreError> {
        self.inner.callbacks.lock().await.insert(id, callback);
        self.inner.tx.try_send(id).map_err(|e| {
            // try_send only fails with Full (queue bound reached) or Closed
            // (shutting down); both map to the same admission rejection.
            match e {
                mpsc::error::TrySendError::Full(_) => CoreError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => CoreError::QueueFull,
            }
        })
    }

    /// Cancels a job: immediate for `QUEUED`, best-effort signal for
    /// `RUNNING`. Idempotent across concurrent callers.
    pub async fn cancel(&self, id: JobId) -> Result<bool, CoreError> {
        self.inner.store.request_cancel(id).await
    }

    /// Stops accepting new submissions, waits `grace`, then cancels every
    /// still-non-terminal job and waits for workers to drain.
    pub async fn shutdown(&self, grace: Duration, handles: Vec<JoinHandle<()>>) {
        self.inner.tx.closed();
        tokio::time::sleep(grace).await;
        self.inner.shutdown.cancel();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(worker_id: u32, inner: Arc<Inner>, rx: Arc<Mutex<mpsc::Receiver<JobId>>>) {
    loop {
        let job_id = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                () = inner.shutdown.cancelled() => return,
                next = rx.recv() => match next {
                    Some(id) => id,
                    None => return,
                },
            }
        };

        let Some(callback) = inner.callbacks.lock().await.remove(&job_id) else {
            warn!(worker_id, %job_id, "no callback registered for dequeued job");
            continue;
        };

        let Some(job) = inner.store.get(job_id).await else {
            warn!(worker_id, %job_id, "dequeued job no longer exists in store");
            continue;
        };

        if job.state.is_terminal() {
            // Cancelled while still queued; nothing left to run.
            continue;
        }

        let permit = inner.max_concurrent.clone().acquire_owned().await;
        let Ok(_permit) = permit else {
            error!(worker_id, %job_id, "worker pool semaphore closed");
            return;
        };

        let transitioned = inner
            .store
            .transition(job_id, JobState::Queued, JobState::Running, |_| {})
            .await;
        if !transitioned {
            continue;
        }

        let deadline = job
            .payload
            .timeout_sec
            .map(Duration::from_secs)
            .or(inner.default_timeout);
        let context = WorkerContext {
            job_id,
            cancel_signal: job.cancel_signal.clone(),
            deadline,
        };

        debug!(worker_id, %job_id, "worker starting job");
        let outcome = callback(job, context).await;
        apply_outcome(&inner.store, job_id, outcome).await;
    }
}

async fn apply_outcome(store: &JobStore, job_id: JobId, outcome: JobOutcome) {
    let (to, patch): (JobState, Box<dyn FnOnce(&mut Job) + Send>) = match outcome {
        JobOutcome::Completed(result) => (
            JobState::Completed,
            Box::new(move |job: &mut Job| {
                job.progress = ytd_core::Progress::complete();
                job.result = Some(result);
            }),
        ),
        JobOutcome::Failed(failure) => (
            JobState::Failed,
            Box::new(move |job: &mut Job| {
                job.error = Some(failure);
            }),
        ),
        JobOutcome::Cancelled => (JobState::Cancelled, Box::new(|_job: &mut Job| {})),
    };

    let applied = store.transition(job_id, JobState::Running, to, patch).await;
    if !applied {
        error!(%job_id, ?to, "terminal transition lost its CAS race, job left RUNNING");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payload() -> JobPayload {
        JobPayload::new("https://example.test/v/1")
    }

    #[tokio::test]
    async fn submitted_job_runs_and_completes() {
        let store = Arc::new(JobStore::new());
        let (pool, handles) = WorkerPool::start(
            store.clone(),
            WorkerPoolConfig {
                workers: 1,
                max_concurrent: 1,
                queue_bound: 4,
                default_timeout: None,
            },
        );

        let callback: JobCallback = Arc::new(|_job, _ctx| {
            Box::pin(async move {
                JobOutcome::Completed(JobResult {
                    relative_path: "out.mp4".into(),
                    size_bytes: 10,
                    title: None,
                    duration_sec: None,
                    format: None,
                    deletion_instant: None,
                })
            })
        });

        let id = pool
            .submit(JobKind::Single, payload(), None, callback)
            .await
            .unwrap();

        for _ in 0..50 {
            if store.get(id).await.unwrap().state.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let job = store.get(id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        pool.shutdown(Duration::from_millis(0), handles).await;
    }

    #[tokio::test]
    async fn queue_full_rejects_admission() {
        let store = Arc::new(JobStore::new());
        let (pool, _handles) = WorkerPool::start(
            store,
            WorkerPoolConfig {
                workers: 0,
                max_concurrent: 1,
                queue_bound: 1,
                default_timeout: None,
            },
        );

        let never_runs: JobCallback =
            Arc::new(|_job, _ctx| Box::pin(async move { JobOutcome::Cancelled }));

        pool.submit(JobKind::Single, payload(), None, never_runs.clone())
            .await
            .unwrap();
        let second = pool
            .submit(JobKind::Single, payload(), None, never_runs)
            .await;
        assert!(matches!(second, Err(CoreError::QueueFull)));
    }

    #[tokio::test]
    async fn cancel_queued_job_never_invokes_callback() {
        let store = Arc::new(JobStore::new());
        let (pool, handles) = WorkerPool::start(
            store.clone(),
            WorkerPoolConfig {
                workers: 1,
                max_concurrent: 1,
                queue_bound: 4,
                default_timeout: None,
            },
        );

        let invocations = Arc::new(AtomicUsize::new(0));
        let counter = invocations.clone();
        let callback: JobCallback = Arc::new(move |_job, _ctx| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                JobOutcome::Completed(JobResult {
                    relative_path: "x".into(),
                    size_bytes: 0,
                    title: None,
                    duration_sec: None,
                    format: None,
                    deletion_instant: None,
                })
            })
        });

        let id = store.create(JobKind::Single, payload(), None).await;
        store.request_cancel(id).await.unwrap();
        pool.enqueue(id, callback).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(id).await.unwrap().state, JobState::Cancelled);
        pool.shutdown(Duration::from_millis(0), handles).await;
    }
}
