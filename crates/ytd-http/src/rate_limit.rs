//! Per-principal token-bucket rate limiting (§4.I) using `governor`.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::state::AppState;

pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Builds a keyed limiter: `rps` sustained requests per second per principal,
/// with a burst allowance of `burst`.
#[must_use]
pub fn build_limiter(rps: u32, burst: u32) -> Arc<KeyedLimiter> {
    let per_second = NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(per_second).allow_burst(burst);
    Arc::new(RateLimiter::keyed(quota))
}

/// Identifies the caller for both rate limiting and logging (§3.1 rate-limit
/// bucket, §4.I): the API key if present, else the peer address captured by
/// `axum::extract::ConnectInfo` (wired in via `into_make_service_with_connect_info`
/// at the server socket), else a fixed fallback bucket shared by all callers
/// the server couldn't otherwise distinguish.
fn principal(req: &Request) -> String {
    req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let key = principal(&req);
    if state.rate_limiter.check_key(&key).is_err() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", "60")],
            axum::Json(serde_json::json!({
                "error": {"code": "RATE_LIMIT", "message": "rate limit exceeded"}
            })),
        )
            .into_response();
    }
    next.run(req).await
}
