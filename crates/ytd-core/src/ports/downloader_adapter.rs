//! The downloader adapter port (§4.E): the one seam between the engine and
//! the external downloader process. Implementations own argv construction,
//! subprocess lifecycle, and progress parsing; this trait only describes the
//! contract.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::ids::JobId;
use crate::job::{JobContext, JobPayload, JobResult};
use crate::progress::{AdapterProgress, LogEntry};

/// Sink the adapter reports streaming progress and log lines to. The worker
/// pool implements this to update the Job Store without the adapter knowing
/// anything about storage.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, progress: AdapterProgress);
    async fn on_log(&self, entry: LogEntry);
}

/// Runs one job to completion against the external downloader binary.
///
/// Implementations must invoke the downloader via an argv array, never a
/// shell string (§4.E invariant), honor `context.cancel_signal` by escalating
/// from a graceful stop to a forced kill, and enforce `context.deadline` and
/// any configured stall timeout by mapping to the matching `CoreError`
/// variant rather than letting the process run unbounded.
#[async_trait]
pub trait DownloaderAdapterPort: Send + Sync {
    async fn run(
        &self,
        job_id: JobId,
        payload: JobPayload,
        context: JobContext,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobResult, CoreError>;
}

/// Where a completed job's primary output file landed, relative to the
/// configured storage root. Adapters resolve this after the subprocess exits
/// successfully by reading back the downloader's own reported output path.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    pub relative_path: PathBuf,
    pub size_bytes: u64,
}
