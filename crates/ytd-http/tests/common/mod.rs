//! Shared test doubles for the downloader and metadata ports: the real
//! subprocess adapters would require a `yt-dlp` binary on the test host, so
//! integration tests exercise the HTTP layer against fakes instead.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use ytd_core::{
    AdapterProgress, ChannelFilters, ChannelInfo, Config, CoreError, DownloaderAdapterPort,
    FormatInfo, JobContext, JobId, JobPayload, JobResult, MetadataExtractorPort, PlaylistPreview,
    ProgressSink, VideoMetadata,
};
pub struct FakeDownloader;

#[async_trait]
impl DownloaderAdapterPort for FakeDownloader {
    async fn run(
        &self,
        _job_id: JobId,
        _payload: JobPayload,
        context: JobContext,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobResult, CoreError> {
        sink.on_progress(AdapterProgress::Finished).await;
        tokio::fs::write(&context.output_path, b"fake media bytes")
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(JobResult {
            relative_path: String::new(),
            size_bytes: 16,
            title: Some("Fake Title".into()),
            duration_sec: Some(42),
            format: Some("mp4".into()),
            deletion_instant: None,
        })
    }
}

pub struct FakeInspector;

#[async_trait]
impl MetadataExtractorPort for FakeInspector {
    async fn metadata(&self, url: &str) -> Result<VideoMetadata, CoreError> {
        Ok(VideoMetadata {
            id: "abc123".into(),
            title: "Fake Title".into(),
            duration_sec: Some(42),
            uploader: Some("fake-uploader".into()),
            upload_date: Some("20240101".into()),
            view_count: Some(100),
            thumbnail_url: None,
            webpage_url: url.to_string(),
        })
    }

    async fn formats(&self, _url: &str) -> Result<Vec<FormatInfo>, CoreError> {
        Ok(vec![FormatInfo {
            format_id: "18".into(),
            ext: "mp4".into(),
            resolution: Some("640x360".into()),
            fps: Some(30.0),
            vcodec: Some("avc1".into()),
            acodec: Some("mp4a".into()),
            filesize_bytes: Some(1024),
            note: None,
        }])
    }

    async fn playlist_preview(
        &self,
        _url: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PlaylistPreview, CoreError> {
        Ok(PlaylistPreview {
            title: Some("Fake Playlist".into()),
            total_items: 0,
            page,
            page_size,
            entries: Vec::new(),
        })
    }

    async fn channel_info(
        &self,
        _url: &str,
        _filters: &ChannelFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ChannelInfo, CoreError> {
        Ok(ChannelInfo {
            channel_title: Some("Fake Channel".into()),
            total_items: 0,
            page,
            page_size,
            entries: Vec::new(),
        })
    }
}

/// Builds a router over a temp storage dir, with the subprocess-backed ports
/// swapped for in-memory fakes. Returns the router and the temp dir (which
/// must stay alive for the duration of the test).
pub async fn test_app(configure: impl FnOnce(&mut Config)) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut config = Config {
        api_key: None,
        require_api_key: false,
        storage_dir: dir.path().to_path_buf(),
        file_retention_hours: 24,
        workers: 2,
        max_concurrent_downloads: 2,
        queue_bound: 8,
        rate_limit_rps: 1000,
        rate_limit_burst: 1000,
        default_timeout_sec: 60,
        progress_timeout_sec: 60,
        max_content_length: 10 * 1024 * 1024,
        allowed_domains: Vec::new(),
        cookie_encryption_key: None,
        webhook_enable: false,
        webhook_timeout_sec: 5,
        webhook_max_retries: 1,
        webhook_secret: None,
        log_level: "warn".into(),
        public_base_url: None,
        port: 0,
        job_purge_interval_sec: 3600,
        job_retention_sec: 3600,
    };
    configure(&mut config);

    let (mut ctx, _handles) = ytd_http::bootstrap(config)
        .await
        .expect("bootstrap should succeed against a writable temp dir");
    ctx.downloader = Arc::new(FakeDownloader);
    ctx.inspector = Arc::new(FakeInspector);

    (ytd_http::create_router(ctx), dir)
}

#[allow(dead_code)]
pub fn storage_path(dir: &tempfile::TempDir, relative: impl Into<PathBuf>) -> PathBuf {
    dir.path().join(relative.into())
}
