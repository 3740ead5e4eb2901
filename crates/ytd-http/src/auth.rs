//! Shared-secret authentication middleware (§4.I): every `/api/v1/*` request
//! must carry a matching `X-API-Key` header when `require_api_key` is set.
//! `/api/v1/health` and `/metrics` are mounted outside this layer.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HttpError;
use crate::state::AppState;
use ytd_core::CoreError;

/// Constant-time comparison so a mismatched key can't be distinguished by
/// timing how many leading bytes matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    if !state.config.require_api_key {
        return Ok(next.run(req).await);
    }

    let Some(expected) = state.config.api_key.as_deref() else {
        return Err(HttpError::Core(CoreError::Internal(
            "REQUIRE_API_KEY is set but API_KEY is not configured".into(),
        )));
    };

    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(next.run(req).await)
    } else {
        Err(HttpError::Core(CoreError::Auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(constant_time_eq(b"secret", b"secret"));
    }

    #[test]
    fn different_lengths_never_match() {
        assert!(!constant_time_eq(b"short", b"longer-key"));
    }

    #[test]
    fn differing_keys_of_equal_length_do_not_match() {
        assert!(!constant_time_eq(b"aaaaaa", b"aaaaab"));
    }
}
