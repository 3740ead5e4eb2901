//! Route definitions and router construction (§6, §4.I).
//!
//! `/api/v1/health` and `/metrics` are mounted outside the auth and
//! rate-limit layers so monitoring never needs a key; every other route goes
//! through both, in that order, then the handler.

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::auth::require_api_key;
use crate::body_limit::body_limit;
use crate::bootstrap::AxumContext;
use crate::handlers;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

/// Gives every request its own `tracing::Span` carrying a fresh request id
/// (SPEC_FULL.md §2), so an `INTERNAL` error logged anywhere downstream
/// during the request can be traced back to this span (§7).
fn request_span(request: &Request) -> tracing::Span {
    let request_id = uuid::Uuid::new_v4();
    info_span!(
        "http_request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/download",
            post(handlers::downloads::create_download).get(handlers::downloads::list_downloads),
        )
        .route(
            "/download/{id}",
            get(handlers::downloads::get_download).delete(handlers::downloads::cancel_download),
        )
        .route("/download/{id}/logs", get(handlers::downloads::get_logs))
        .route("/batch/download", post(handlers::batch::create_batch))
        .route(
            "/batch/{id}",
            get(handlers::batch::get_batch).delete(handlers::batch::cancel_batch),
        )
        .route(
            "/cookies",
            post(handlers::cookies::upload_cookies).get(handlers::cookies::list_cookies),
        )
        .route(
            "/cookies/{id}",
            get(handlers::cookies::get_cookies).delete(handlers::cookies::delete_cookies),
        )
        .route("/metadata", get(handlers::metadata::get_metadata))
        .route("/formats", get(handlers::metadata::get_formats))
        .route("/playlist/preview", get(handlers::playlist::preview))
        .route(
            "/playlist/download",
            post(handlers::playlist::create_playlist_download),
        )
        .route("/channel/info", get(handlers::channel::info))
        .route(
            "/channel/download",
            post(handlers::channel::create_channel_download),
        )
}

async fn files_method_not_allowed() -> axum::http::StatusCode {
    axum::http::StatusCode::METHOD_NOT_ALLOWED
}

/// Builds the full router: unauthenticated health/metrics, the rate-limited
/// and authenticated `/api/v1/*` surface, and unauthenticated file serving
/// (path confinement is its own safety net, independent of auth — §4.A).
///
/// Middleware order on the protected surface is trace -> auth -> rate-limit
/// -> body-size validation -> handler.
pub fn create_router(ctx: AxumContext) -> Router {
    let max_body_bytes = usize::try_from(ctx.config.max_content_length).unwrap_or(usize::MAX);
    let state: AppState = std::sync::Arc::new(ctx);

    let api = protected_routes()
        .layer(middleware::from_fn_with_state(state.clone(), body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/api/v1/health", get(handlers::health::health))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", api)
        .route(
            "/files/{*relative}",
            get(handlers::files::serve_file).delete(files_method_not_allowed),
        )
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
