//! Port definitions (trait abstractions) for the infrastructure this engine
//! depends on: the downloader subprocess, the credential vault, the
//! retention scheduler, and the webhook notifier. Each trait uses only
//! domain types from this crate, so adapter crates depend on `ytd-core` and
//! never the reverse.

pub mod downloader_adapter;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use downloader_adapter::{DownloaderAdapterPort, ProgressSink, ResolvedOutput};

use crate::credential::CredentialMetadata;
use crate::error::CoreError;
use crate::ids::CredentialId;
use crate::job::ChannelFilters;
use crate::metadata::{ChannelInfo, FormatInfo, PlaylistPreview, VideoMetadata};
use crate::progress::WebhookEvent;

/// Encrypt-at-rest storage for browser cookie jars (§4.B).
#[async_trait]
pub trait CredentialVaultPort: Send + Sync {
    /// Encrypt and persist a raw cookie jar, returning its public metadata.
    async fn store(
        &self,
        display_name: String,
        source_browser: Option<String>,
        covered_domains: Vec<String>,
        cookie_jar: Vec<u8>,
    ) -> Result<CredentialMetadata, CoreError>;

    /// Decrypt a credential to a private, owner-only temp file for the
    /// adapter to pass to the downloader. Callers must release it with
    /// [`CredentialVaultPort::release_plaintext`] once the job finishes.
    async fn issue_plaintext(&self, id: CredentialId) -> Result<PathBuf, CoreError>;

    /// Idempotently remove an issued plaintext temp file.
    async fn release_plaintext(&self, path: &Path);

    async fn metadata(&self, id: CredentialId) -> Result<CredentialMetadata, CoreError>;

    async fn list(&self) -> Result<Vec<CredentialMetadata>, CoreError>;

    async fn delete(&self, id: CredentialId) -> Result<(), CoreError>;
}

/// Schedules and cancels deferred file deletions (§4.C).
#[async_trait]
pub trait RetentionSchedulerPort: Send + Sync {
    async fn schedule_deletion(&self, path: PathBuf, at: chrono::DateTime<chrono::Utc>);

    /// No-op if `path` was never scheduled or already fired.
    async fn cancel_deletion(&self, path: &Path);
}

/// Delivers webhook events to job- and batch-configured callback URLs
/// (§4.D). Dispatch is fire-and-forget from the caller's perspective;
/// implementations own their own retry and throttling policy.
#[async_trait]
pub trait WebhookSenderPort: Send + Sync {
    async fn send(&self, url: String, event: WebhookEvent);
}

/// Read-only inspection of a URL without ever invoking a download (§6
/// `/metadata`, `/formats`, `/playlist/preview`, `/channel/info`).
#[async_trait]
pub trait MetadataExtractorPort: Send + Sync {
    async fn metadata(&self, url: &str) -> Result<VideoMetadata, CoreError>;

    async fn formats(&self, url: &str) -> Result<Vec<FormatInfo>, CoreError>;

    async fn playlist_preview(
        &self,
        url: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PlaylistPreview, CoreError>;

    async fn channel_info(
        &self,
        url: &str,
        filters: &ChannelFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ChannelInfo, CoreError>;
}
