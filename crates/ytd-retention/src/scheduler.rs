//! Single-worker retention scheduler (§4.C): a min-heap keyed by fire
//! instant, drained by one background task woken on every schedule/cancel.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, warn};
use ytd_core::RetentionSchedulerPort;

struct Entry {
    fire_instant: Instant,
    seq: u64,
    path: PathBuf,
    tombstoned: Arc<AtomicBool>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_instant == other.fire_instant && self.seq == other.seq
    }
}
impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the soonest deadline first.
        other
            .fire_instant
            .cmp(&self.fire_instant)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Shared {
    heap: Mutex<BinaryHeap<Entry>>,
    pending: Mutex<HashMap<PathBuf, Arc<AtomicBool>>>,
    notify: Notify,
    seq: AtomicU64,
    storage_root: PathBuf,
}

/// Background deletion scheduler. Cloning shares the same worker and queue.
#[derive(Clone)]
pub struct RetentionScheduler {
    shared: Arc<Shared>,
}

impl RetentionScheduler {
    /// Spawns the background worker. `storage_root` bounds how far up the
    /// directory tree empty-ancestor cleanup is allowed to climb.
    #[must_use]
    pub fn start(storage_root: impl Into<PathBuf>) -> Self {
        let shared = Arc::new(Shared {
            heap: Mutex::new(BinaryHeap::new()),
            pending: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
            storage_root: storage_root.into(),
        });

        let worker_shared = shared.clone();
        tokio::spawn(async move {
            run_worker(worker_shared).await;
        });

        Self { shared }
    }

    fn to_instant(at: chrono::DateTime<chrono::Utc>) -> Instant {
        let now_utc = chrono::Utc::now();
        let delta = (at - now_utc).to_std().unwrap_or(Duration::ZERO);
        Instant::now() + delta
    }
}

#[async_trait]
impl RetentionSchedulerPort for RetentionScheduler {
    async fn schedule_deletion(&self, path: PathBuf, at: chrono::DateTime<chrono::Utc>) {
        let tombstoned = Arc::new(AtomicBool::new(false));

        {
            let mut pending = self.shared.pending.lock().unwrap();
            if let Some(previous) = pending.insert(path.clone(), tombstoned.clone()) {
                previous.store(true, AtomicOrdering::SeqCst);
            }
        }

        let seq = self.shared.seq.fetch_add(1, AtomicOrdering::SeqCst);
        let entry = Entry {
            fire_instant: Self::to_instant(at),
            seq,
            path,
            tombstoned,
        };
        self.shared.heap.lock().unwrap().push(entry);
        self.shared.notify.notify_one();
    }

    async fn cancel_deletion(&self, path: &Path) {
        let mut pending = self.shared.pending.lock().unwrap();
        if let Some(flag) = pending.remove(path) {
            flag.store(true, AtomicOrdering::SeqCst);
        }
        self.shared.notify.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let next_wake = {
            let heap = shared.heap.lock().unwrap();
            heap.peek().map(|e| e.fire_instant)
        };

        match next_wake {
            None => shared.notify.notified().await,
            Some(instant) => {
                tokio::select! {
                    () = tokio::time::sleep_until(instant.into()) => {}
                    () = shared.notify.notified() => {}
                }
            }
        }

        drain_due(&shared).await;
    }
}

async fn drain_due(shared: &Shared) {
    let now = Instant::now();
    loop {
        let due = {
            let mut heap = shared.heap.lock().unwrap();
            match heap.peek() {
                Some(entry) if entry.fire_instant <= now => heap.pop(),
                _ => None,
            }
        };

        let Some(entry) = due else { break };

        {
            let mut pending = shared.pending.lock().unwrap();
            if let Some(flag) = pending.get(&entry.path) {
                if Arc::ptr_eq(flag, &entry.tombstoned) {
                    pending.remove(&entry.path);
                }
            }
        }

        if entry.tombstoned.load(AtomicOrdering::SeqCst) {
            debug!(path = %entry.path.display(), "skipping tombstoned retention entry");
            continue;
        }

        delete_and_prune(&entry.path, &shared.storage_root).await;
    }
}

async fn delete_and_prune(path: &Path, storage_root: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "deleted expired artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete expired artifact");
            return;
        }
    }

    let Ok(canonical_root) = storage_root.canonicalize() else {
        return;
    };

    let mut dir = path.parent().map(Path::to_path_buf);
    while let Some(current) = dir {
        let Ok(canonical_current) = current.canonicalize() else {
            break;
        };
        if canonical_current == canonical_root || !canonical_current.starts_with(&canonical_root) {
            break;
        }

        match tokio::fs::remove_dir(&current).await {
            Ok(()) => dir = current.parent().map(Path::to_path_buf),
            Err(_) => break,
        }
    }
}
