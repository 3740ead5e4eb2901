//! `GET /api/v1/health` and `GET /metrics` (§6): liveness and a minimal
//! Prometheus-text metrics surface. Both are mounted outside the auth and
//! rate-limit layers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = state.job_store.list(&ytd_engine::JobFilter::default()).await;
    let running = jobs
        .iter()
        .filter(|j| j.state == ytd_core::JobState::Running)
        .count();
    let queued = jobs
        .iter()
        .filter(|j| j.state == ytd_core::JobState::Queued)
        .count();

    let body = format!(
        "# HELP ytd_jobs_total Number of jobs currently tracked by state.\n\
         # TYPE ytd_jobs_total gauge\n\
         ytd_jobs_total{{state=\"running\"}} {running}\n\
         ytd_jobs_total{{state=\"queued\"}} {queued}\n"
    );

    ([("content-type", "text/plain; version=0.0.4")], body)
}
