//! Request/response shapes for the read-only inspection surface:
//! `/api/v1/metadata`, `/formats`, `/playlist/preview`, `/channel/info` (§6).

use serde::Deserialize;
use ytd_core::ChannelFilters;

#[derive(Debug, Clone, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub url: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelQuery {
    pub url: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub date_after: Option<String>,
    #[serde(default)]
    pub date_before: Option<String>,
    #[serde(default)]
    pub min_duration: Option<u64>,
    #[serde(default)]
    pub max_duration: Option<u64>,
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub max_views: Option<u64>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl ChannelQuery {
    #[must_use]
    pub fn filters(&self) -> ChannelFilters {
        ChannelFilters {
            date_after: self.date_after.clone(),
            date_before: self.date_before.clone(),
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            min_views: self.min_views,
            max_views: self.max_views,
            sort_by: self.sort_by.clone(),
        }
    }
}
