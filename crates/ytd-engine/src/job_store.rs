//! The Job Store (§4.F): an in-process, concurrency-safe map of job records.
//!
//! Each record is held behind its own mutex so that a writer never blocks
//! readers of other jobs; the outer map is only locked to find or insert a
//! record, never held across a callback or I/O.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::{Mutex, RwLock};
use ytd_core::{
    BatchId, CoreError, Job, JobKind, JobPayload, JobState, LogEntry, LogLevel, Progress,
};

/// Log lines beyond this count are dropped, oldest first (§4.F).
const DEFAULT_LOG_CAPACITY: usize = 1_000;

/// Optional filters for [`JobStore::list`].
#[derive(Clone, Debug, Default)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub kind: Option<JobKind>,
    pub parent_batch_id: Option<BatchId>,
}

impl JobFilter {
    fn matches(&self, job: &Job) -> bool {
        self.state.is_none_or(|s| s == job.state)
            && self.kind.is_none_or(|k| k == job.kind)
            && self
                .parent_batch_id
                .is_none_or(|id| job.parent_batch_id == Some(id))
    }
}

/// Concurrency-safe job record store (§4.F).
pub struct JobStore {
    jobs: RwLock<IndexMap<ytd_core::JobId, Arc<Mutex<Job>>>>,
    log_capacity: usize,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(IndexMap::new()),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Creates a new job in `QUEUED` and returns its id.
    pub async fn create(
        &self,
        kind: JobKind,
        payload: JobPayload,
        parent_batch_id: Option<BatchId>,
    ) -> ytd_core::JobId {
        let job = Job::new(kind, payload, parent_batch_id);
        let id = job.id;
        self.jobs.write().await.insert(id, Arc::new(Mutex::new(job)));
        id
    }

    async fn record(&self, id: ytd_core::JobId) -> Option<Arc<Mutex<Job>>> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// A read-only snapshot, or `None` if the id is unknown.
    pub async fn get(&self, id: ytd_core::JobId) -> Option<Job> {
        let record = self.record(id).await?;
        let job = record.lock().await;
        Some(job.snapshot())
    }

    /// Snapshots of every job matching `filter`, in creation order.
    pub async fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut out = Vec::new();
        for record in jobs.values() {
            let job = record.lock().await;
            if filter.matches(&job) {
                out.push(job.snapshot());
            }
        }
        out
    }

    /// Compare-and-swap state transition: applies `patch` and moves the
    /// record to `to` only if it is currently `from`. Returns whether the
    /// transition took effect.
    pub async fn transition(
        &self,
        id: ytd_core::JobId,
        from: JobState,
        to: JobState,
        patch: impl FnOnce(&mut Job),
    ) -> bool {
        let Some(record) = self.record(id).await else {
            return false;
        };
        let mut job = record.lock().await;
        if job.state != from {
            return false;
        }
        patch(&mut job);
        job.state = to;
        if to.is_terminal() {
            job.completed_at = Some(Utc::now());
        } else if to == JobState::Running {
            job.started_at = Some(Utc::now());
        }
        true
    }

    /// Appends a log line, dropping the oldest entry once the bounded buffer
    /// overflows.
    pub async fn append_log(&self, id: ytd_core::JobId, level: LogLevel, message: impl Into<String>) {
        let Some(record) = self.record(id).await else {
            return;
        };
        let mut job = record.lock().await;
        job.logs.push(LogEntry::new(level, message));
        if job.logs.len() > self.log_capacity {
            let overflow = job.logs.len() - self.log_capacity;
            job.logs.drain(0..overflow);
        }
    }

    /// The bounded log buffer for a job, oldest first.
    pub async fn logs(&self, id: ytd_core::JobId) -> Option<Vec<LogEntry>> {
        let record = self.record(id).await?;
        let job = record.lock().await;
        Some(job.logs.clone())
    }

    /// Updates a job's progress. Only applied while the job is `RUNNING`
    /// (§4.F) — a late progress tick racing a terminal transition is
    /// silently dropped rather than resurrecting a finished job's numbers.
    pub async fn patch_progress(&self, id: ytd_core::JobId, progress: Progress) {
        let Some(record) = self.record(id).await else {
            return;
        };
        let mut job = record.lock().await;
        if job.state == JobState::Running {
            job.progress = progress;
        }
    }

    /// Drops terminal jobs whose `completed_at` (or, absent that,
    /// `created_at`) is older than `max_age`. Returns the number removed.
    pub async fn purge_older_than(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let mut jobs = self.jobs.write().await;
        let mut doomed = Vec::new();
        for (id, record) in jobs.iter() {
            let job = record.lock().await;
            if job.state.is_terminal() && job.completed_at.unwrap_or(job.created_at) < cutoff {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            jobs.shift_remove(id);
        }
        doomed.len()
    }

    /// Sets `cancel_signal` and, if the job is still `QUEUED`, transitions it
    /// straight to `CANCELLED`. Returns `Err(NotFound)` for an unknown id and
    /// `Ok(false)` if the job was already terminal.
    pub async fn request_cancel(&self, id: ytd_core::JobId) -> Result<bool, CoreError> {
        let Some(record) = self.record(id).await else {
            return Err(CoreError::NotFound(id.to_string()));
        };
        let mut job = record.lock().await;
        if job.state.is_terminal() {
            return Ok(false);
        }
        job.cancel_signal.cancel();
        if job.state == JobState::Queued {
            job.state = JobState::Cancelled;
            job.completed_at = Some(Utc::now());
        }
        Ok(true)
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytd_core::JobFailure;

    fn payload() -> JobPayload {
        JobPayload::new("https://example.test/v/1")
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        let job = store.get(id).await.unwrap();
        assert_eq!(job.state, JobState::Queued);
    }

    #[tokio::test]
    async fn transition_fails_on_state_mismatch() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        let ok = store
            .transition(id, JobState::Running, JobState::Completed, |_| {})
            .await;
        assert!(!ok);
        assert_eq!(store.get(id).await.unwrap().state, JobState::Queued);
    }

    #[tokio::test]
    async fn transition_applies_patch_on_cas_success() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        store
            .transition(id, JobState::Queued, JobState::Running, |_| {})
            .await;
        let ok = store
            .transition(id, JobState::Running, JobState::Failed, |job| {
                job.error = Some(JobFailure {
                    code: "INTERNAL".into(),
                    message: "boom".into(),
                });
            })
            .await;
        assert!(ok);
        let job = store.get(id).await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.unwrap().code, "INTERNAL");
    }

    #[tokio::test]
    async fn log_buffer_drops_oldest_entries_on_overflow() {
        let store = JobStore {
            jobs: RwLock::new(IndexMap::new()),
            log_capacity: 3,
        };
        let id = store.create(JobKind::Single, payload(), None).await;
        for i in 0..5 {
            store
                .append_log(id, LogLevel::Info, format!("line {i}"))
                .await;
        }
        let logs = store.logs(id).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "line 2");
        assert_eq!(logs[2].message, "line 4");
    }

    #[tokio::test]
    async fn progress_is_ignored_outside_running_state() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        store.patch_progress(id, Progress::from_bytes(1, 2, 0.0)).await;
        assert_eq!(store.get(id).await.unwrap().progress.percent, 0.0);
    }

    #[tokio::test]
    async fn purge_removes_only_old_terminal_jobs() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        store
            .transition(id, JobState::Queued, JobState::Cancelled, |_| {})
            .await;
        let removed = store.purge_older_than(Duration::from_secs(0)).await;
        assert_eq!(removed, 1);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn purge_keeps_non_terminal_jobs() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        let removed = store.purge_older_than(Duration::from_secs(0)).await;
        assert_eq!(removed, 0);
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test]
    async fn cancel_queued_job_transitions_immediately() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        let cancelled = store.request_cancel(id).await.unwrap();
        assert!(cancelled);
        assert_eq!(store.get(id).await.unwrap().state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_running_job_only_signals() {
        let store = JobStore::new();
        let id = store.create(JobKind::Single, payload(), None).await;
        store
            .transition(id, JobState::Queued, JobState::Running, |_| {})
            .await;
        let cancelled = store.request_cancel(id).await.unwrap();
        assert!(cancelled);
        assert_eq!(store.get(id).await.unwrap().state, JobState::Running);
    }

    #[tokio::test]
    async fn cancel_on_unknown_job_is_not_found() {
        let store = JobStore::new();
        let err = store.request_cancel(ytd_core::JobId::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
