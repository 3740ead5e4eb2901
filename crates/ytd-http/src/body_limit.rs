//! Request body size enforcement (§4.I, `MAX_CONTENT_LENGTH`).
//!
//! Rejects oversized requests by their declared `Content-Length` before any
//! extractor buffers the body, mirroring `auth.rs`/`rate_limit.rs`'s
//! middleware-function-over-`AppState` shape.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HttpError;
use crate::state::AppState;

pub async fn body_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let too_large = req
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > state.config.max_content_length);

    if too_large {
        return HttpError::PayloadTooLarge.into_response();
    }
    next.run(req).await
}
