//! The orchestration core: Job Store (§4.F), bounded queue/worker pool
//! (§4.G) and Batch Coordinator (§4.H).

pub mod coordinator;
pub mod job_store;
pub mod queue;

pub use coordinator::BatchCoordinator;
pub use job_store::{JobFilter, JobStore};
pub use queue::{BoxFuture, JobCallback, JobOutcome, WorkerContext, WorkerPool, WorkerPoolConfig};
