//! Shared domain types for the job-orchestration engine: job and batch
//! entities, the closed error taxonomy, configuration, and the port traits
//! adapter crates implement.

pub mod batch;
pub mod config;
pub mod credential;
pub mod error;
pub mod ids;
pub mod job;
pub mod metadata;
pub mod ports;
pub mod progress;
pub mod validation;

pub use batch::{Batch, BatchCounts, BatchPolicy, BatchState};
pub use config::{Config, ConfigError};
pub use credential::CredentialMetadata;
pub use error::{CoreError, CoreResult};
pub use ids::{BatchId, CredentialId, JobId};
pub use job::{
    CancelSignal, ChannelFilters, Job, JobContext, JobFailure, JobKind, JobPayload, JobResult,
    JobState,
};
pub use metadata::{ChannelInfo, FormatInfo, ListingEntry, PlaylistPreview, VideoMetadata};
pub use ports::{
    CredentialVaultPort, DownloaderAdapterPort, MetadataExtractorPort, ProgressSink,
    ResolvedOutput, RetentionSchedulerPort, WebhookSenderPort,
};
pub use progress::{AdapterProgress, LogEntry, LogLevel, Progress, WebhookEvent, WebhookEventKind};
pub use validation::{confine_to_storage_root, expand_output_template, sanitize_filename_component, validate_url, TemplateFields};
