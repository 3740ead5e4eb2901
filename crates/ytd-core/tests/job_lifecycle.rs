//! Integration coverage for the invariants in spec §8 that span multiple
//! domain types (job + batch + error taxonomy) rather than a single module.

use ytd_core::{Batch, BatchPolicy, BatchState, CoreError, JobId, JobKind, JobPayload};

#[test]
fn completed_job_result_and_error_are_mutually_exclusive_by_construction() {
    let mut job = ytd_core::Job::new(JobKind::Single, JobPayload::new("https://example.test/v/1"), None);
    job.result = Some(ytd_core::JobResult {
        relative_path: "out.mp4".into(),
        size_bytes: 10,
        title: None,
        duration_sec: None,
        format: None,
        deletion_instant: None,
    });
    assert!(job.error.is_none());
}

#[test]
fn batch_with_single_failure_is_terminal_failed() {
    let ids = vec![JobId::new(), JobId::new()];
    let mut batch = Batch::new(ids, BatchPolicy::ContinueOnError, 2);
    batch.counts.completed = 1;
    batch.counts.failed = 1;
    assert!(batch.is_complete());
    assert_eq!(batch.terminal_state(), BatchState::Failed);
}

#[test]
fn every_core_error_variant_maps_to_a_defined_http_status() {
    let variants = [
        CoreError::Validation("x".into()),
        CoreError::Auth,
        CoreError::RateLimit,
        CoreError::NotFound("x".into()),
        CoreError::Conflict("x".into()),
        CoreError::QueueFull,
        CoreError::PathUnsafe("x".into()),
        CoreError::SubprocessSpawnFailed("x".into()),
        CoreError::SubprocessNonzeroExit(1),
        CoreError::Timeout,
        CoreError::StallTimeout(10),
        CoreError::Cancelled,
        CoreError::OutputMissing("x".into()),
        CoreError::DecryptFailed,
        CoreError::InvalidFormat("x".into()),
        CoreError::Internal("x".into()),
    ];
    for err in variants {
        assert!(err.http_status() >= 400);
        assert!(!err.code().is_empty());
    }
}
