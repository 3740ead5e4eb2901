//! Auth and rate-limit middleware ordering (§4.I): health/metrics bypass
//! both; everything else requires a key when configured, and is throttled
//! per principal.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

#[tokio::test]
async fn health_and_metrics_need_no_key() {
    let (app, _dir) = common::test_app(|cfg| {
        cfg.require_api_key = true;
        cfg.api_key = Some("s3cret".into());
    })
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_key_is_rejected() {
    let (app, _dir) = common::test_app(|cfg| {
        cfg.require_api_key = true;
        cfg.api_key = Some("s3cret".into());
    })
    .await;

    let response = app
        .oneshot(Request::get("/api/v1/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_with_matching_key_succeeds() {
    let (app, _dir) = common::test_app(|cfg| {
        cfg.require_api_key = true;
        cfg.api_key = Some("s3cret".into());
    })
    .await;

    let response = app
        .oneshot(
            Request::get("/api/v1/download")
                .header("x-api-key", "s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn exceeding_the_rate_limit_returns_429_with_retry_after() {
    let (app, _dir) = common::test_app(|cfg| {
        cfg.rate_limit_rps = 1;
        cfg.rate_limit_burst = 1;
    })
    .await;

    let first = app
        .clone()
        .oneshot(Request::get("/api/v1/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(Request::get("/api/v1/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));

    let body = second.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "RATE_LIMIT");
}
