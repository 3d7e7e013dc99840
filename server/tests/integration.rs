//! Integration tests for the HTTP routes

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use audio_core::PlaybackState;
use common::{create_failing_app, create_test_app, test_state, tone_pcm};
use server::{build_router, error::GENERATION_NOTICE, handlers::MIX_STATUS_HEADER};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_api_prefix_mirrors_root() {
    let app = create_test_app();

    let response = app.oneshot(get("/api/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = create_test_app();

    let response = app.oneshot(get("/api/nowhere")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], 404);
    assert!(json["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_catalog_lists_choices() {
    let app = create_test_app();

    let response = app.oneshot(get("/catalog")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["paths"].as_array().unwrap().len(), 6);
    assert_eq!(json["languages"].as_array().unwrap().len(), 7);
    assert_eq!(json["paths"][0]["id"], "Zen Buddhism");
    assert_eq!(json["voices"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_lesson_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/lesson",
            json!({ "path": "Zen Buddhism", "gender": "Male", "tone": "Deep" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["lesson_text"], "Breathe in the stillness of Zen Buddhism.");
    assert_eq!(json["background_url"], "https://example.test/bg.png");
    assert!(json["guru_url"].is_null());
    assert_eq!(json["sample_rate"], 24_000);
    assert_eq!(json["duration_ms"], 500);

    let audio = general_purpose::STANDARD
        .decode(json["audio_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio.len(), 24_000);
}

#[tokio::test]
async fn test_lesson_failure_shows_notice() {
    let app = create_failing_app();

    let response = app
        .oneshot(post_json("/lesson", json!({ "path": "Buddhism" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], GENERATION_NOTICE);
    assert_eq!(json["code"], 502);
}

#[tokio::test]
async fn test_lesson_rejects_unknown_path() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json("/lesson", json!({ "path": "Stoicism" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_speech_wav_wraps_pcm() {
    let app = create_test_app();
    let pcm = tone_pcm(0.25);

    let response = app
        .oneshot(post_json(
            "/speech/wav",
            json!({ "audio_base64": general_purpose::STANDARD.encode(&pcm) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 44 + pcm.len());
    assert_eq!(&body[0..4], b"RIFF");
    assert_eq!(&body[44..], &pcm[..]);
}

#[tokio::test]
async fn test_speech_wav_rejects_bad_base64() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json("/speech/wav", json!({ "audio_base64": "not base64!" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_wav_rejects_empty_payload() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json("/speech/wav", json!({ "audio_base64": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_mixes_speech_over_ambience() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/export",
            json!({
                "audio_base64": general_purpose::STANDARD.encode(tone_pcm(0.5)),
                "path": "Zen Buddhism",
                "language": "Italian",
                "seed": 7,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[MIX_STATUS_HEADER], "mixed");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Virtual_Temple_Zen_Buddhism_Italian.wav\""
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(body.to_vec())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.bits_per_sample, 16);
    // half a second of speech plus the two second tail
    assert_eq!(reader.duration(), 60_000);
}

#[tokio::test]
async fn test_export_falls_back_to_speech_only() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/export",
            json!({
                "audio_base64": general_purpose::STANDARD.encode([1u8, 2, 3]),
                "path": "Universal Harmony",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[MIX_STATUS_HEADER], "speech-only");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Lesson_Speech_Only.wav\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 47);
}

#[tokio::test]
async fn test_ambient_start_volume_stop() {
    let state = test_state(false);
    let app = build_router(state.clone()).unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/ambient/start", json!({ "volume": 0.3 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["state"], "playing");
    assert_eq!(state.ambient.state(), PlaybackState::Playing);

    let response = app
        .clone()
        .oneshot(post_json("/ambient/volume", json!({ "volume": 0.6 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json("/ambient/stop", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.ambient.state(), PlaybackState::Idle);

    let response = app.oneshot(get("/ambient")).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["state"], "idle");
    assert_eq!(json["sample_rate"], 24_000);
}

#[tokio::test]
async fn test_ambient_rejects_invalid_volume() {
    let state = test_state(false);
    let app = build_router(state.clone()).unwrap();

    let response = app
        .oneshot(post_json("/ambient/start", json!({ "volume": 1.5 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.ambient.state(), PlaybackState::Idle);
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json("/speech/wav", json!({ "audio_base64": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["endpoints"]["speech"]["request_count"], 1);
    assert_eq!(json["endpoints"]["speech"]["error_count"], 1);
    assert_eq!(json["audio"]["mixed_exports"], 0);
}
