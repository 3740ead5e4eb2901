//! The error taxonomy shared across every component (job errors, HTTP errors).
//!
//! Designed to be serializable and free of non-serializable foreign error types
//! (`std::io::Error`, `reqwest::Error`, …) so it can sit on a `Job` record and be
//! sent back over the wire unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A closed taxonomy of failure kinds, shared between job records and the HTTP
/// admission layer's error responses.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreError {
    /// Bad input: URL, path template, schema validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid `X-API-Key`.
    #[error("authentication required")]
    Auth,

    /// Per-principal token bucket exhausted.
    #[error("rate limit exceeded")]
    RateLimit,

    /// Unknown job, batch or credential id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not valid for the current state (e.g. cancel on a terminal job).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Admission rejected because the bounded queue is full.
    #[error("queue full")]
    QueueFull,

    /// A caller-supplied path escaped the storage root or crossed a symlink.
    #[error("unsafe path: {0}")]
    PathUnsafe(String),

    /// The downloader subprocess could not be spawned.
    #[error("failed to spawn downloader: {0}")]
    SubprocessSpawnFailed(String),

    /// The downloader subprocess exited with a non-zero status.
    #[error("downloader exited with status {0}")]
    SubprocessNonzeroExit(i32),

    /// The job's deadline elapsed before completion.
    #[error("timed out")]
    Timeout,

    /// No progress was observed for longer than the configured stall window.
    #[error("stalled: no progress for {0}s")]
    StallTimeout(u64),

    /// The job (or its cancel signal) was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The downloader reported success but the expected output file is absent.
    #[error("output file missing: {0}")]
    OutputMissing(String),

    /// Vault decryption failed an integrity check.
    #[error("decryption failed")]
    DecryptFailed,

    /// The credential blob was not a recognizable cookie jar.
    #[error("invalid credential format: {0}")]
    InvalidFormat(String),

    /// Unexpected internal condition; always logged with the request id.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The HTTP status this error maps to when surfaced synchronously by the
    /// admission layer (§7). Errors that only ever terminate a job (not a
    /// request) still have a nominal mapping for completeness.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::PathUnsafe(_) => 400,
            Self::Auth => 401,
            Self::NotFound(_) => 404,
            Self::RateLimit => 429,
            Self::QueueFull => 503,
            Self::DecryptFailed => 500,
            Self::SubprocessSpawnFailed(_)
            | Self::SubprocessNonzeroExit(_)
            | Self::Timeout
            | Self::StallTimeout(_)
            | Self::Cancelled
            | Self::OutputMissing(_)
            | Self::InvalidFormat(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code, as used in `error.code` on job records.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Auth => "AUTH",
            Self::RateLimit => "RATE_LIMIT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::QueueFull => "QUEUE_FULL",
            Self::PathUnsafe(_) => "PATH_UNSAFE",
            Self::SubprocessSpawnFailed(_) => "SUBPROCESS_SPAWN_FAILED",
            Self::SubprocessNonzeroExit(_) => "SUBPROCESS_NONZERO_EXIT",
            Self::Timeout => "TIMEOUT",
            Self::StallTimeout(_) => "STALL_TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::OutputMissing(_) => "OUTPUT_MISSING",
            Self::DecryptFailed => "DECRYPT_FAILED",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a job in this failure state could plausibly succeed if the
    /// client resubmits unchanged (informational only — the engine never
    /// auto-retries downloads, per spec).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::StallTimeout(_) | Self::SubprocessSpawnFailed(_)
        )
    }
}

/// Convenience result alias used throughout the workspace.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_taxonomy_table() {
        assert_eq!(CoreError::Validation("bad url".into()).http_status(), 400);
        assert_eq!(CoreError::Auth.http_status(), 401);
        assert_eq!(CoreError::RateLimit.http_status(), 429);
        assert_eq!(CoreError::NotFound("job-1".into()).http_status(), 404);
        assert_eq!(CoreError::QueueFull.http_status(), 503);
        assert_eq!(CoreError::PathUnsafe("../etc".into()).http_status(), 400);
    }

    #[test]
    fn error_serializes_with_stable_code_tag() {
        let err = CoreError::QueueFull;
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("QUEUE_FULL"));

        let parsed: CoreError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn recoverable_classification() {
        assert!(CoreError::Timeout.is_recoverable());
        assert!(!CoreError::Cancelled.is_recoverable());
        assert!(!CoreError::Validation("x".into()).is_recoverable());
    }
}
