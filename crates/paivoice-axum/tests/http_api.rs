//! End-to-end tests of the HTTP surface against a fake speech sink.
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`;
//! everything the queue worker would speak is captured on a channel so
//! tests can assert on the fully resolved speech requests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use paivoice_axum::rate_limit::RateLimiter;
use paivoice_axum::{DaemonContext, create_router};
use paivoice_core::voices::VoicePersona;
use paivoice_core::{
    DaemonConfig, Engine, Pronunciations, ProsodyOverride, VoiceCatalog, VoiceError,
};
use paivoice_engine::{AudioQueue, SpeechRequest, SpeechSink};

/// Sink that forwards every spoken request to the test.
struct ChannelSink {
    tx: mpsc::UnboundedSender<SpeechRequest>,
}

#[async_trait]
impl SpeechSink for ChannelSink {
    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        let _ = self.tx.send(request.clone());
        Ok(())
    }

    fn playback_application(&self) -> Option<&'static str> {
        None
    }
}

fn test_config() -> DaemonConfig {
    DaemonConfig {
        port: 8888,
        pai_dir: std::env::temp_dir(),
        elevenlabs_api_key: None,
        preferred_engine: None,
        piper_model: std::env::temp_dir().join("model.onnx"),
        qwen3_port: 8001,
        default_voice_id: "voice-default".to_string(),
        owner_name: "PAI".to_string(),
        identity_voice: ProsodyOverride::default(),
        reduced_voice_feedback: false,
    }
}

fn test_app_with(
    config: DaemonConfig,
    voices: VoiceCatalog,
    pronunciations: Pronunciations,
) -> (Router, mpsc::UnboundedReceiver<SpeechRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = AudioQueue::start(Arc::new(ChannelSink { tx }));
    let state = Arc::new(DaemonContext {
        config,
        selection: Engine::OsTts,
        voices,
        pronunciations,
        queue,
        rate_limiter: RateLimiter::new(),
    });
    (create_router(state), rx)
}

fn test_app() -> (Router, mpsc::UnboundedReceiver<SpeechRequest>) {
    test_app_with(
        test_config(),
        VoiceCatalog::default(),
        Pronunciations::default(),
    )
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn recv_spoken(rx: &mut mpsc::UnboundedReceiver<SpeechRequest>) -> SpeechRequest {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("queue worker did not process the request")
        .expect("queue closed")
}

#[tokio::test]
async fn health_never_fails_and_reports_selection() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["port"], 8888);
    assert_eq!(body["voice_system"], Engine::OsTts.description());
    assert_eq!(body["selected_local_engine"], "auto");
    assert_eq!(body["elevenlabs_configured"], false);
    assert_eq!(body["default_voice_id"], "voice-default");
    assert_eq!(body["platform"], std::env::consts::OS);
}

#[tokio::test]
async fn notify_returns_success_and_enqueues_speech() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json("/notify", json!({"message": "Build complete"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Notification sent");

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.text, "Build complete");
    assert_eq!(spoken.voice_id, "voice-default");
    // No overrides anywhere: the defaults apply.
    assert!((spoken.prosody.stability - 0.5).abs() < f32::EPSILON);
    assert!((spoken.volume - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn defaults_apply_when_body_is_empty() {
    let (app, mut rx) = test_app();
    let response = app.oneshot(post_json("/notify", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.text, "Task completed");
}

#[tokio::test]
async fn non_string_message_is_rejected() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(post_json("/notify", json!({"message": 42})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Invalid Message");
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(post_json("/notify", json!({"message": "a".repeat(501)})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Message too long");
}

#[tokio::test]
async fn hostile_message_is_sanitised_before_speech() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json(
            "/notify",
            json!({"message": "**Build** [DONE] finished; see [logs](https://ci.example.com)"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.text, "Build finished see logs");
}

#[tokio::test]
async fn voice_enabled_false_skips_the_queue() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json(
            "/notify",
            json!({"message": "Silent update", "voice_enabled": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "nothing should have been enqueued");
}

#[tokio::test]
async fn voice_name_resolves_through_the_catalog() {
    let mut voices = BTreeMap::new();
    voices.insert(
        "Ash".to_string(),
        VoicePersona {
            voice_id: Some("el-ash-01".to_string()),
            settings: ProsodyOverride {
                stability: Some(0.6),
                volume: Some(0.8),
                ..ProsodyOverride::default()
            },
            description: None,
        },
    );
    let (app, mut rx) = test_app_with(
        test_config(),
        VoiceCatalog::from_map(voices),
        Pronunciations::default(),
    );

    let response = app
        .oneshot(post_json(
            "/notify",
            json!({
                "message": "Deploy done",
                "voice_name": "ash",
                "voice_settings": {"speed": 1.3}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.voice_id, "el-ash-01");
    // Voice-config fields apply under the request override.
    assert!((spoken.prosody.stability - 0.6).abs() < f32::EPSILON);
    assert!((spoken.prosody.speed - 1.3).abs() < f32::EPSILON);
    assert!((spoken.volume - 0.8).abs() < f32::EPSILON);
}

#[tokio::test]
async fn voice_id_wins_over_voice_name() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json(
            "/notify",
            json!({
                "message": "Hello",
                "voice_id": "explicit-id",
                "voice_name": "Ash"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.voice_id, "explicit-id");
}

#[tokio::test]
async fn eleventh_request_in_window_is_rate_limited() {
    let (app, mut rx) = test_app();

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(post_json("/notify", json!({"message": "ping"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/notify", json!({"message": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Rate limit exceeded");

    // The ten admitted requests all made it to the queue.
    for _ in 0..10 {
        recv_spoken(&mut rx).await;
    }

    // A different client key is admitted immediately.
    let request = Request::builder()
        .method("POST")
        .uri("/notify")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "10.0.0.9")
        .body(Body::from(json!({"message": "other"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn pai_alias_accepts_title_and_message() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json(
            "/pai",
            json!({"title": "Agent", "message": "Task finished"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.text, "Task finished");
}

#[tokio::test]
async fn pai_alias_ignores_voice_fields() {
    let (app, mut rx) = test_app();
    let response = app
        .oneshot(post_json(
            "/pai",
            json!({"message": "hi", "voice_id": "should-be-ignored"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.voice_id, "voice-default");
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let (app, _rx) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/notify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn options_preflight_returns_no_content() {
    let (app, _rx) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/notify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn pronunciations_are_applied_on_the_speech_path() {
    let mut map = BTreeMap::new();
    map.insert("PAI".to_string(), "pie".to_string());
    let (app, mut rx) = test_app_with(
        test_config(),
        VoiceCatalog::default(),
        Pronunciations::from_map(&map),
    );

    let response = app
        .oneshot(post_json("/notify", json!({"message": "pai is ready"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spoken = recv_spoken(&mut rx).await;
    assert_eq!(spoken.text, "pie is ready");
}
