//! Path and URL validation (§4.A): the only component allowed to decide
//! whether caller-supplied strings are safe to act on.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::CoreError;

const MAX_URL_LEN: usize = 2048;
const MAX_TEMPLATE_RESULT_LEN: usize = 255;

/// Validate a download URL: absolute, http(s) scheme, bounded length,
/// non-empty host, and (if configured) host allow-listed by suffix match.
pub fn validate_url(raw: &str, allowed_domains: &[String]) -> Result<Url, CoreError> {
    if raw.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "url exceeds {MAX_URL_LEN} characters"
        )));
    }

    let url = Url::parse(raw).map_err(|e| CoreError::Validation(format!("invalid url: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CoreError::Validation(format!(
                "unsupported url scheme: {other}"
            )));
        }
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| CoreError::Validation("url must have a non-empty host".into()))?;

    if !allowed_domains.is_empty() {
        let host_lower = host.to_ascii_lowercase();
        let allowed = allowed_domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host_lower == domain || host_lower.ends_with(&format!(".{domain}"))
        });
        if !allowed {
            return Err(CoreError::Validation(format!(
                "host '{host}' is not in the configured allow-list"
            )));
        }
    }

    Ok(url)
}

/// Replace filesystem-unsafe characters, collapse repeated separators, strip
/// leading/trailing dots and whitespace, and truncate to a safe length.
/// Used both for `safe_title` substitution and any other template field that
/// feeds a path segment.
#[must_use]
pub fn sanitize_filename_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_underscore = false;

    for ch in input.chars() {
        let is_unsafe = matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || ch.is_control();
        if is_unsafe {
            if !last_was_underscore {
                out.push('_');
                last_was_underscore = true;
            }
        } else {
            out.push(ch);
            last_was_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let truncated: String = trimmed.chars().take(MAX_TEMPLATE_RESULT_LEN).collect();

    if truncated.is_empty() {
        "_".to_string()
    } else {
        truncated
    }
}

/// Expand an output-path template's known substitutions (§4.A):
/// `{id, title, safe_title, ext, uploader, date, random, playlist, playlist_index}`.
/// Unknown `{...}` placeholders are left untouched by design — the adapter
/// only ever receives templates this function has already processed.
pub struct TemplateFields<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub ext: &'a str,
    pub uploader: Option<&'a str>,
    pub date: Option<&'a str>,
    pub playlist: Option<&'a str>,
    pub playlist_index: Option<u32>,
}

#[must_use]
pub fn expand_output_template(template: &str, fields: &TemplateFields<'_>, random_token: &str) -> String {
    let safe_title = sanitize_filename_component(fields.title);
    let playlist_index = fields
        .playlist_index
        .map_or_else(String::new, |i| i.to_string());

    template
        .replace("{id}", fields.id)
        .replace("{title}", fields.title)
        .replace("{safe_title}", &safe_title)
        .replace("{ext}", fields.ext)
        .replace("{uploader}", fields.uploader.unwrap_or("unknown"))
        .replace("{date}", fields.date.unwrap_or("unknown"))
        .replace("{random}", random_token)
        .replace("{playlist}", fields.playlist.unwrap_or(""))
        .replace("{playlist_index}", &playlist_index)
}

/// Confine a caller-supplied relative path beneath `storage_root` (§4.A,
/// §8 scenario 9). Joins, canonicalizes, and rejects anything that escapes
/// the root or crosses a symlink on any segment.
pub fn confine_to_storage_root(storage_root: &Path, relative: &str) -> Result<PathBuf, CoreError> {
    if relative.contains('\0') {
        return Err(CoreError::PathUnsafe(relative.to_string()));
    }

    let candidate = storage_root.join(relative);

    let canonical_root = storage_root
        .canonicalize()
        .map_err(|_| CoreError::Internal("storage root is not accessible".into()))?;

    // Canonicalization fails outright for paths with non-existent components
    // or that traverse a dangling symlink — both map to PATH_UNSAFE since a
    // legitimate served file always already exists on disk.
    let canonical_candidate = candidate
        .canonicalize()
        .map_err(|_| CoreError::PathUnsafe(relative.to_string()))?;

    if !canonical_candidate.starts_with(&canonical_root) {
        return Err(CoreError::PathUnsafe(relative.to_string()));
    }

    // Reject any symlink among the path's own components (the canonicalized
    // final path may coincide with a symlink target while an intermediate
    // segment was itself a symlink the caller doesn't control).
    let mut walked = canonical_root.clone();
    for component in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
        walked.push(component);
        if let Ok(meta) = walked.symlink_metadata() {
            if meta.file_type().is_symlink() {
                return Err(CoreError::PathUnsafe(relative.to_string()));
            }
        }
    }

    Ok(canonical_candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn accepts_plain_https_url() {
        assert!(validate_url("https://example.test/v/1", &[]).is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = validate_url("ftp://example.test/file", &[]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_url_over_length_limit() {
        let long = format!("https://example.test/{}", "a".repeat(MAX_URL_LEN));
        assert!(validate_url(&long, &[]).is_err());
    }

    #[test]
    fn allow_list_matches_by_domain_suffix() {
        let allowed = vec!["example.test".to_string()];
        assert!(validate_url("https://sub.example.test/x", &allowed).is_ok());
        assert!(validate_url("https://evil.test/x", &allowed).is_err());
    }

    #[test]
    fn sanitizes_unsafe_filename_characters() {
        let result = sanitize_filename_component("bad/name:here?*");
        assert!(!result.contains('/'));
        assert!(!result.contains(':'));
        assert!(!result.contains('?'));
    }

    #[test]
    fn sanitize_collapses_runs_and_trims_dots() {
        let result = sanitize_filename_component("..title//with***stuff..");
        assert!(!result.starts_with('.'));
        assert!(!result.ends_with('.'));
        assert!(!result.contains("__"));
    }

    #[test]
    fn template_expansion_substitutes_known_fields() {
        let fields = TemplateFields {
            id: "abc123",
            title: "My Video",
            ext: "mp4",
            uploader: Some("someone"),
            date: Some("20240101"),
            playlist: None,
            playlist_index: Some(3),
        };
        let out = expand_output_template("{uploader}/{id}_{safe_title}.{ext}", &fields, "rnd");
        assert_eq!(out, "someone/abc123_My Video.mp4");
    }

    #[test]
    fn confinement_rejects_parent_traversal() {
        let dir = tempdir().unwrap();
        let err = confine_to_storage_root(dir.path(), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, CoreError::PathUnsafe(_)));
    }

    #[test]
    fn confinement_accepts_file_within_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.mp4"), b"data").unwrap();
        let result = confine_to_storage_root(dir.path(), "good.mp4");
        assert!(result.is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn confinement_rejects_symlinked_file() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let secret = outside.path().join("secret");
        fs::write(&secret, b"top secret").unwrap();
        symlink(&secret, dir.path().join("good.mp4")).unwrap();

        let err = confine_to_storage_root(dir.path(), "good.mp4").unwrap_err();
        assert!(matches!(err, CoreError::PathUnsafe(_)));
    }
}
