//! End-to-end admission-layer flow against the fake downloader/inspector:
//! create, poll, list and cancel a download job; create and inspect a batch.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_download_runs_to_completion() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let request = Request::post("/api/v1/download")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "url": "https://example.test/watch?v=abc123" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = body_json(response).await;
    let id = job["job_id"].as_str().unwrap().to_string();
    assert_eq!(job["state"], "QUEUED");

    let mut state = job["state"].as_str().unwrap().to_string();
    for _ in 0..50 {
        if state == "COMPLETED" || state == "FAILED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/v1/download/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let job = body_json(response).await;
        state = job["state"].as_str().unwrap().to_string();
    }

    assert_eq!(state, "COMPLETED");
}

#[tokio::test]
async fn unknown_job_id_is_404() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let id = uuid::Uuid::new_v4();
    let response = app
        .oneshot(
            Request::get(format!("/api/v1/download/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_url_is_rejected_before_queueing() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let request = Request::post("/api/v1/download")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "url": "not-a-url" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn playlist_download_runs_to_completion() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let request = Request::post("/api/v1/playlist/download")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "url": "https://example.test/playlist?list=abc" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = body_json(response).await;
    assert_eq!(job["kind"], "playlist");
    assert_eq!(job["state"], "QUEUED");
}

#[tokio::test]
async fn channel_download_runs_to_completion() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let request = Request::post("/api/v1/channel/download")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "url": "https://example.test/@someone", "max_downloads": 5 }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let job = body_json(response).await;
    assert_eq!(job["kind"], "channel");
    assert_eq!(job["state"], "QUEUED");
}

#[tokio::test]
async fn batch_download_fans_out_children() {
    let (app, _dir) = common::test_app(|_| {}).await;

    let request = Request::post("/api/v1/batch/download")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "urls": [
                    "https://example.test/watch?v=one",
                    "https://example.test/watch?v=two",
                ],
                "concurrency_cap": 1,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let batch = body_json(response).await;
    assert_eq!(batch["child_ids"].as_array().unwrap().len(), 2);

    let id = batch["id"].as_str().unwrap().to_string();
    let response = app
        .oneshot(
            Request::get(format!("/api/v1/batch/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
