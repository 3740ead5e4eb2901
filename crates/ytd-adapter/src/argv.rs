//! Builds the yt-dlp argv for one job. Never shells out to a string — every
//! argument is its own element so user-supplied values can't be interpreted
//! by a shell (§4.E invariant).

use std::path::Path;

use ytd_core::{ChannelFilters, JobKind, JobPayload};

/// Machine-parseable progress marker emitted once per yt-dlp progress tick.
/// Kept short and JSON-shaped so the adapter can `serde_json::from_str` the
/// suffix directly.
pub const PROGRESS_MARKER: &str = "__YTD_PROGRESS__";

fn progress_template() -> String {
    format!(
        "download:{PROGRESS_MARKER}{{\"downloaded_bytes\": %(progress.downloaded_bytes)s, \
         \"total_bytes\": %(progress.total_bytes)s, \"speed\": %(progress.speed)s, \
         \"eta\": %(progress.eta)s, \"playlist_index\": %(info.playlist_index)s, \
         \"playlist_count\": %(info.playlist_count)s}}"
    )
}

#[must_use]
pub fn build_args(
    kind: JobKind,
    payload: &JobPayload,
    output_path: &Path,
    cookies_path: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();

    args.push("--newline".to_string());
    args.push("--progress-template".to_string());
    args.push(progress_template());
    args.push("--no-color".to_string());

    if matches!(kind, JobKind::Single) {
        args.push("--no-playlist".to_string());
    }

    if payload.audio_only {
        args.push("-x".to_string());
        if let Some(format) = &payload.format {
            args.push("--audio-format".to_string());
            args.push(format.clone());
        }
    } else if let Some(format) = &payload.format {
        args.push("-f".to_string());
        args.push(format.clone());
    } else if let Some(quality) = &payload.quality {
        args.push("-S".to_string());
        args.push(format!("res:{quality}"));
    }

    if payload.subtitles {
        args.push("--write-subs".to_string());
        args.push("--sub-langs".to_string());
        args.push("all".to_string());
    }

    if payload.thumbnail {
        args.push("--write-thumbnail".to_string());
    }

    if payload.metadata {
        args.push("--write-info-json".to_string());
    }

    if let Some(range) = &payload.item_range {
        args.push("--playlist-items".to_string());
        args.push(range.clone());
    }

    if let Some(max) = payload.max_downloads {
        args.push("--max-downloads".to_string());
        args.push(max.to_string());
    }

    push_filter_args(&mut args, &payload.filters);

    if let Some(cookies) = cookies_path {
        args.push("--cookies".to_string());
        args.push(cookies.display().to_string());
    }

    args.push("-o".to_string());
    args.push(output_path.display().to_string());
    args.push(payload.url.clone());

    args
}

fn push_filter_args(args: &mut Vec<String>, filters: &ChannelFilters) {
    if let Some(after) = &filters.date_after {
        args.push("--dateafter".to_string());
        args.push(after.clone());
    }
    if let Some(before) = &filters.date_before {
        args.push("--datebefore".to_string());
        args.push(before.clone());
    }
    if let Some(sort) = &filters.sort_by {
        args.push("-S".to_string());
        args.push(sort.clone());
    }

    let mut expr = Vec::new();
    if let Some(min) = filters.min_duration {
        expr.push(format!("duration >= {min}"));
    }
    if let Some(max) = filters.max_duration {
        expr.push(format!("duration <= {max}"));
    }
    if let Some(min) = filters.min_views {
        expr.push(format!("view_count >= {min}"));
    }
    if let Some(max) = filters.max_views {
        expr.push(format!("view_count <= {max}"));
    }
    if !expr.is_empty() {
        args.push("--match-filter".to_string());
        args.push(expr.join(" & "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn audio_only_uses_extract_audio_flag() {
        let mut payload = JobPayload::new("https://example.test/v/1");
        payload.audio_only = true;
        payload.format = Some("mp3".to_string());
        let args = build_args(JobKind::Single, &payload, &PathBuf::from("/tmp/out.mp3"), None);
        assert!(args.iter().any(|a| a == "-x"));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
    }

    #[test]
    fn single_job_disables_playlist_expansion() {
        let payload = JobPayload::new("https://example.test/v/1");
        let args = build_args(JobKind::Single, &payload, &PathBuf::from("/tmp/out.mp4"), None);
        assert!(args.iter().any(|a| a == "--no-playlist"));
    }

    #[test]
    fn playlist_job_passes_item_range_and_cap() {
        let mut payload = JobPayload::new("https://example.test/playlist?list=1");
        payload.item_range = Some("1-5".to_string());
        payload.max_downloads = Some(5);
        let args = build_args(JobKind::Playlist, &payload, &PathBuf::from("/tmp/%(id)s"), None);
        assert!(!args.iter().any(|a| a == "--no-playlist"));
        assert!(args.windows(2).any(|w| w == ["--playlist-items", "1-5"]));
        assert!(args.windows(2).any(|w| w == ["--max-downloads", "5"]));
    }

    #[test]
    fn cookies_path_is_passed_through() {
        let payload = JobPayload::new("https://example.test/v/1");
        let cookies = PathBuf::from("/tmp/cookies.txt");
        let args = build_args(JobKind::Single, &payload, &PathBuf::from("/tmp/out.mp4"), Some(&cookies));
        assert!(args.windows(2).any(|w| w[0] == "--cookies" && w[1] == cookies.display().to_string()));
    }

    #[test]
    fn duration_and_view_filters_combine_into_match_filter() {
        let mut payload = JobPayload::new("https://example.test/c/channel");
        payload.filters.min_duration = Some(60);
        payload.filters.max_views = Some(1_000_000);
        let args = build_args(JobKind::Channel, &payload, &PathBuf::from("/tmp/%(id)s"), None);
        let idx = args.iter().position(|a| a == "--match-filter").unwrap();
        assert!(args[idx + 1].contains("duration >= 60"));
        assert!(args[idx + 1].contains("view_count <= 1000000"));
    }
}
