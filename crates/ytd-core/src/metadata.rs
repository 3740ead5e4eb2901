//! Metadata-only extraction types (§6 `GET /metadata`, `/formats`,
//! `/playlist/preview`, `/channel/info`): these never invoke a download, only
//! inspect what the downloader would produce.

use serde::{Deserialize, Serialize};

/// A single video's metadata, independent of any download (§6 `/metadata`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub duration_sec: Option<u64>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub webpage_url: String,
}

/// One selectable encoding (§6 `/formats`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize_bytes: Option<u64>,
    pub note: Option<String>,
}

/// One entry in a playlist or channel listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListingEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_sec: Option<u64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
}

/// A page of a playlist listing (§6 `GET /api/v1/playlist/preview`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaylistPreview {
    pub title: Option<String>,
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
    pub entries: Vec<ListingEntry>,
}

/// A page of a filtered channel listing (§6 `GET /api/v1/channel/info`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_title: Option<String>,
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
    pub entries: Vec<ListingEntry>,
}
