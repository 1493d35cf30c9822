//! API integration tests for dailywall-server.
//!
//! These tests drive the router on an in-memory store with realistic
//! multipart and JSON requests: submission, dedup, moderation and the
//! image of the day.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use dailywall_core::{FixedClock, MemoryStore};
use dailywall_server::{create_router, create_router_with_state, AppState, Config};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

/// Synthetic wallpaper: a 16x9 grid of random tiles, one layout per variant
fn wallpaper(variant: u32) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(u64::from(variant));
    let cells: Vec<u8> = (0..16 * 9).map(|_| rng.gen()).collect();
    let img = RgbImage::from_fn(320, 180, |x, y| {
        let v = cells[(y / 20 * 16 + x / 20) as usize];
        Rgb([v, v, v.saturating_add(12)])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Helper to create a multipart body with a single `file` field
fn create_upload_multipart(content: &[u8], file_name: &str) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Test config: small synthetic images pass the upload policy
fn test_config() -> Config {
    Config {
        min_width: 1,
        min_height: 1,
        aspect_ratio_margin: f64::INFINITY,
        ..Config::default()
    }
}

fn create_test_app() -> Router {
    let config = test_config();
    let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(clock), &config).unwrap();
    create_router_with_state(&config, state)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

fn post_upload(content: &[u8], file_name: &str) -> Request<Body> {
    let (content_type, body) = create_upload_multipart(content, file_name);
    Request::builder()
        .method("POST")
        .uri("/images")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

async fn upload(app: &Router, variant: u32) -> i64 {
    let response = send(app, post_upload(&wallpaper(variant), "wall.png")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

async fn approve(app: &Router, id: i64) {
    let response = send(
        app,
        post_json(&format!("/moderation/images/{}/approve", id), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_router().unwrap();

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store_backend"], "memory");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let app = create_test_app();

    let response = send(&app, get("/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_test_app();

    let response = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/image-of-the-day"].is_object());
}

// ============================================================================
// Submission Tests
// ============================================================================

#[tokio::test]
async fn test_upload_creates_pending_image() {
    let app = create_test_app();

    let response = send(&app, post_upload(&wallpaper(1), "aurora.png")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["file_name"], "aurora.png");
    assert_eq!(json["content_type"], "image/png");
    assert_eq!(json["width"], 320);
    assert_eq!(json["height"], 180);
    assert_eq!(json["is_approved"], false);
    assert_eq!(json["fingerprint"].as_str().unwrap().len(), 50);
}

#[tokio::test]
async fn test_reupload_is_conflict() {
    let app = create_test_app();
    let first = upload(&app, 1).await;

    let response = send(&app, post_upload(&wallpaper(1), "again.png")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["code"], "DUPLICATE_IMAGE");
    assert_eq!(json["matched_image_id"], first);
    assert_eq!(json["match_kind"], "exact");
}

#[tokio::test]
async fn test_upload_invalid_image_is_bad_request() {
    let app = create_test_app();

    let response = send(&app, post_upload(b"definitely not an image", "x.png")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn test_upload_below_policy_is_rejected() {
    // Default policy requires 1920x1080
    let app = create_router().unwrap();

    let response = send(&app, post_upload(&wallpaper(1), "small.png")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "IMAGE_REJECTED");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Image resolution is too low (320x180)"));
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let app = create_test_app();

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/images")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_url_upload_rejects_non_http_scheme() {
    let app = create_test_app();

    let response = send(
        &app,
        post_json("/images/url", json!({ "url": "file:///etc/passwd" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Moderation & Gallery Tests
// ============================================================================

#[tokio::test]
async fn test_pending_image_hidden_until_approved() {
    let app = create_test_app();
    let id = upload(&app, 2).await;

    let response = send(&app, get(&format!("/images/{}", id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let pending = body_json(send(&app, get("/moderation/pending")).await).await;
    assert_eq!(pending["total"], 1);
    assert_eq!(pending["items"][0]["id"], id);

    approve(&app, id).await;

    let response = send(&app, get(&format!("/images/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["is_approved"], true);

    let pending = body_json(send(&app, get("/moderation/pending")).await).await;
    assert_eq!(pending["total"], 0);

    let gallery = body_json(send(&app, get("/images?page=1")).await).await;
    assert_eq!(gallery["total"], 1);
    assert_eq!(gallery["per_page"], 12);
}

#[tokio::test]
async fn test_approve_unknown_image_is_not_found() {
    let app = create_test_app();

    let response = send(&app, post_json("/moderation/images/999/approve", json!({}))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_approve_counts_new_approvals() {
    let app = create_test_app();
    let a = upload(&app, 1).await;
    let b = upload(&app, 2).await;
    approve(&app, a).await;

    let response = send(
        &app,
        post_json("/moderation/approve", json!({ "ids": [a, b, 999] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["approved"], 1);
}

#[tokio::test]
async fn test_raw_image_returns_stored_bytes() {
    let app = create_test_app();
    let bytes = wallpaper(3);
    let response = send(&app, post_upload(&bytes, "raw.png")).await;
    let id = body_json(response).await["id"].as_i64().unwrap();

    let response = send(&app, get(&format!("/images/{}/raw", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), bytes.as_slice());
}

// ============================================================================
// Image of the Day Tests
// ============================================================================

#[tokio::test]
async fn test_image_of_the_day_without_approved_images() {
    let app = create_test_app();
    upload(&app, 1).await;

    let response = send(&app, get("/image-of-the-day")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NO_ELIGIBLE_IMAGE");
}

#[tokio::test]
async fn test_image_of_the_day_is_stable() {
    let app = create_test_app();
    for variant in 1..=3 {
        let id = upload(&app, variant).await;
        approve(&app, id).await;
    }

    let first = body_json(send(&app, get("/image-of-the-day")).await).await;
    assert_eq!(first["date"], "2024-03-09");
    let id = first["image"]["id"].as_i64().unwrap();
    assert_eq!(first["image"]["url"], format!("/images/{}/raw", id));

    for _ in 0..3 {
        let again = body_json(send(&app, get("/image-of-the-day")).await).await;
        assert_eq!(again, first);
    }

    let response = send(&app, get("/image-of-the-day.jpeg")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=3600");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}
