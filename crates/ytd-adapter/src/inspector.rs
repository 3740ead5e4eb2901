//! Read-only URL inspection (§6 `/metadata`, `/formats`, `/playlist/preview`,
//! `/channel/info`): runs the downloader in `--dump-single-json` mode, which
//! never writes a media file, and reshapes its output into typed records.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use ytd_core::{
    ChannelFilters, ChannelInfo, CoreError, FormatInfo, ListingEntry, MetadataExtractorPort,
    PlaylistPreview, VideoMetadata,
};

pub struct YtDlpInspector {
    binary_path: PathBuf,
}

impl YtDlpInspector {
    #[must_use]
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

impl Default for YtDlpInspector {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[derive(Deserialize, Default)]
struct RawFormat {
    format_id: String,
    #[serde(default)]
    ext: String,
    resolution: Option<String>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    format_note: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    upload_date: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    duration: Option<f64>,
    uploader: Option<String>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    entries: Option<Vec<RawEntry>>,
    playlist_title: Option<String>,
    channel: Option<String>,
    playlist_count: Option<u64>,
}

fn paginate(mut entries: Vec<ListingEntry>, page: u32, page_size: u32) -> (u64, Vec<ListingEntry>) {
    let total = entries.len() as u64;
    let start = (page.saturating_sub(1) as usize) * (page_size.max(1) as usize);
    if start >= entries.len() {
        return (total, Vec::new());
    }
    let end = (start + page_size.max(1) as usize).min(entries.len());
    (total, entries.drain(start..end).collect())
}

impl YtDlpInspector {
    async fn dump_json(&self, url: &str, flat_playlist: bool) -> Result<RawInfo, CoreError> {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("--dump-single-json")
            .arg("--no-warnings")
            .arg("--no-playlist-reverse");
        if flat_playlist {
            command.arg("--flat-playlist");
        }
        command.arg(url).stdout(Stdio::piped()).stderr(Stdio::null());

        let output = command
            .output()
            .await
            .map_err(|e| CoreError::SubprocessSpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(CoreError::SubprocessNonzeroExit(
                output.status.code().unwrap_or(-1),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CoreError::Internal(format!("failed to parse downloader metadata: {e}")))
    }
}

fn entry_to_listing(raw: RawEntry) -> ListingEntry {
    ListingEntry {
        id: raw.id.clone(),
        title: if raw.title.is_empty() {
            raw.id
        } else {
            raw.title
        },
        url: raw.webpage_url.or(raw.url).unwrap_or_default(),
        duration_sec: raw.duration.map(|d| d as u64),
        view_count: raw.view_count,
        upload_date: raw.upload_date,
    }
}

#[async_trait]
impl MetadataExtractorPort for YtDlpInspector {
    async fn metadata(&self, url: &str) -> Result<VideoMetadata, CoreError> {
        let raw = self.dump_json(url, false).await?;
        Ok(VideoMetadata {
            id: raw.id,
            title: raw.title,
            duration_sec: raw.duration.map(|d| d as u64),
            uploader: raw.uploader,
            upload_date: raw.upload_date,
            view_count: raw.view_count,
            thumbnail_url: raw.thumbnail,
            webpage_url: raw.webpage_url.unwrap_or_else(|| url.to_string()),
        })
    }

    async fn formats(&self, url: &str) -> Result<Vec<FormatInfo>, CoreError> {
        let raw = self.dump_json(url, false).await?;
        Ok(raw
            .formats
            .into_iter()
            .map(|f| FormatInfo {
                format_id: f.format_id,
                ext: f.ext,
                resolution: f.resolution,
                fps: f.fps,
                vcodec: f.vcodec,
                acodec: f.acodec,
                filesize_bytes: f.filesize.or(f.filesize_approx),
                note: f.format_note,
            })
            .collect())
    }

    async fn playlist_preview(
        &self,
        url: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PlaylistPreview, CoreError> {
        let raw = self.dump_json(url, true).await?;
        let entries: Vec<ListingEntry> = raw
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(entry_to_listing)
            .collect();
        let (total, page_entries) = paginate(entries, page, page_size);
        Ok(PlaylistPreview {
            title: raw.playlist_title.or(Some(raw.title)),
            total_items: total,
            page,
            page_size,
            entries: page_entries,
        })
    }

    async fn channel_info(
        &self,
        url: &str,
        filters: &ChannelFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ChannelInfo, CoreError> {
        let raw = self.dump_json(url, true).await?;
        let mut entries: Vec<ListingEntry> = raw
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(entry_to_listing)
            .collect();

        apply_filters(&mut entries, filters);

        let (total, page_entries) = paginate(entries, page, page_size);
        Ok(ChannelInfo {
            channel_title: raw.channel.or(raw.playlist_title).or(Some(raw.title)),
            total_items: total,
            page,
            page_size,
            entries: page_entries,
        })
    }
}

fn apply_filters(entries: &mut Vec<ListingEntry>, filters: &ChannelFilters) {
    entries.retain(|e| {
        if let Some(min) = filters.min_duration {
            if e.duration_sec.is_none_or(|d| d < min) {
                return false;
            }
        }
        if let Some(max) = filters.max_duration {
            if e.duration_sec.is_none_or(|d| d > max) {
                return false;
            }
        }
        if let Some(min) = filters.min_views {
            if e.view_count.is_none_or(|v| v < min) {
                return false;
            }
        }
        if let Some(max) = filters.max_views {
            if e.view_count.is_none_or(|v| v > max) {
                return false;
            }
        }
        if let Some(after) = &filters.date_after {
            if e.upload_date.as_deref().is_none_or(|d| d < after.as_str()) {
                return false;
            }
        }
        if let Some(before) = &filters.date_before {
            if e.upload_date.as_deref().is_none_or(|d| d > before.as_str()) {
                return false;
            }
        }
        true
    });

    if filters.sort_by.as_deref() == Some("views") {
        entries.sort_by(|a, b| b.view_count.unwrap_or(0).cmp(&a.view_count.unwrap_or(0)));
    } else if filters.sort_by.as_deref() == Some("date") {
        entries.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_slices_correct_window() {
        let entries: Vec<ListingEntry> = (0..25)
            .map(|i| ListingEntry {
                id: i.to_string(),
                title: i.to_string(),
                url: String::new(),
                duration_sec: None,
                view_count: None,
                upload_date: None,
            })
            .collect();
        let (total, page) = paginate(entries, 2, 10);
        assert_eq!(total, 25);
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].id, "10");
    }

    #[test]
    fn pagination_past_the_end_is_empty() {
        let entries: Vec<ListingEntry> = (0..5)
            .map(|i| ListingEntry {
                id: i.to_string(),
                title: i.to_string(),
                url: String::new(),
                duration_sec: None,
                view_count: None,
                upload_date: None,
            })
            .collect();
        let (total, page) = paginate(entries, 5, 10);
        assert_eq!(total, 5);
        assert!(page.is_empty());
    }

    #[test]
    fn min_duration_filter_excludes_shorter_entries() {
        let mut entries = vec![
            ListingEntry {
                id: "a".into(),
                title: "a".into(),
                url: String::new(),
                duration_sec: Some(30),
                view_count: None,
                upload_date: None,
            },
            ListingEntry {
                id: "b".into(),
                title: "b".into(),
                url: String::new(),
                duration_sec: Some(300),
                view_count: None,
                upload_date: None,
            },
        ];
        let filters = ChannelFilters {
            min_duration: Some(60),
            ..ChannelFilters::default()
        };
        apply_filters(&mut entries, &filters);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "b");
    }
}
