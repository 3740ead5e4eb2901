//! The `Batch` entity: composition of N jobs under one parent (§3.1, §4.H).

use serde::{Deserialize, Serialize};

use crate::ids::{BatchId, JobId};
use crate::job::JobState;

/// Partial-failure handling for a batch's children (§3.1, §4.H).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Cancel remaining `QUEUED` children as soon as one fails.
    StopOnError,
    /// Let every child run to completion regardless of siblings' outcomes.
    ContinueOnError,
}

/// Terminal state of a batch, mirroring `JobState`'s terminal variants
/// (§3.3: "a batch is in a terminal state iff all its children are terminal").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchState {
    Running,
    Completed,
    Failed,
}

/// Aggregate counters derived from child job states (§3.1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub queued: u32,
    pub running: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
}

impl BatchCounts {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.queued + self.running + self.completed + self.failed + self.cancelled
    }

    #[must_use]
    pub const fn terminal(&self) -> u32 {
        self.completed + self.failed + self.cancelled
    }

    pub fn record(&mut self, state: JobState) {
        match state {
            JobState::Queued => self.queued += 1,
            JobState::Running => self.running += 1,
            JobState::Completed => self.completed += 1,
            JobState::Failed => self.failed += 1,
            JobState::Cancelled => self.cancelled += 1,
        }
    }
}

/// A batch record (§3.1): `child_ids` preserves submission order; `policy` and
/// `concurrency_cap` govern dispatch (§4.H).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub child_ids: Vec<JobId>,
    pub policy: BatchPolicy,
    pub concurrency_cap: u32,
    pub state: BatchState,
    pub counts: BatchCounts,
    pub overall_percent: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Batch {
    #[must_use]
    pub fn new(child_ids: Vec<JobId>, policy: BatchPolicy, concurrency_cap: u32) -> Self {
        let mut counts = BatchCounts::default();
        counts.queued = u32::try_from(child_ids.len()).unwrap_or(u32::MAX);
        Self {
            id: BatchId::new(),
            child_ids,
            policy,
            concurrency_cap,
            state: BatchState::Running,
            counts,
            overall_percent: 0.0,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    /// True once every child has reached a terminal state (§3.3).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let total = u32::try_from(self.child_ids.len()).unwrap_or(u32::MAX);
        self.counts.terminal() >= total
    }

    /// `COMPLETED` iff every child completed, else `FAILED` (§4.H step 6).
    #[must_use]
    pub const fn terminal_state(&self) -> BatchState {
        if self.counts.failed == 0 && self.counts.cancelled == 0 {
            BatchState::Completed
        } else {
            BatchState::Failed
        }
    }
}
