//! HTTP handlers for the notification endpoints.
//!
//! `/notify` is the primary endpoint; `/pai` is a thin alias that passes
//! only `title` and `message` through; `/health` reports the cached
//! engine selection and never fails.
//!
//! The voice path is fire-and-forget: the handler validates, fires the
//! desktop notification, enqueues the speech work and answers 200 without
//! awaiting synthesis or playback.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use paivoice_core::{Prosody, ProsodyOverride, VoiceError, prepare_speech_text, resolve_volume};
use paivoice_engine::{SpeechRequest, send_desktop_notification};

use crate::error::HttpError;
use crate::state::AppState;
use crate::validate;

/// Message used when the request has none.
pub const DEFAULT_MESSAGE: &str = "Task completed";

/// Success response body for both notification endpoints.
#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    message: &'static str,
}

/// `POST /notify`
pub async fn notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<StatusResponse>, HttpError> {
    handle_notification(&state, &headers, &body)
}

/// `POST /pai` — alias accepting `{title, message}` only.
pub async fn pai(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<StatusResponse>, HttpError> {
    let mut slim = serde_json::Map::new();
    for field in ["title", "message"] {
        if let Some(value) = body.get(field) {
            slim.insert(field.to_string(), value.clone());
        }
    }
    handle_notification(&state, &headers, &Value::Object(slim))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        port: state.config.port,
        voice_system: state.selection.description(),
        selected_local_engine: state
            .config
            .preferred_engine
            .map_or("auto", paivoice_core::Engine::label),
        elevenlabs_configured: state.config.elevenlabs_configured(),
        default_voice_id: state.config.default_voice_id.clone(),
        platform: std::env::consts::OS,
    })
}

/// Health snapshot; every field is available without touching the queue.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub port: u16,
    pub voice_system: &'static str,
    pub selected_local_engine: &'static str,
    pub elevenlabs_configured: bool,
    pub default_voice_id: String,
    pub platform: &'static str,
}

/// Explicit OPTIONS answer; the CORS layer adds the headers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn client_key(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1")
}

fn handle_notification(
    state: &AppState,
    headers: &HeaderMap,
    body: &Value,
) -> Result<Json<StatusResponse>, HttpError> {
    if !state.rate_limiter.try_admit(client_key(headers)) {
        return Err(VoiceError::RateLimited.into());
    }

    // The default title carries the DA identity ("PAI Notification"
    // unless the settings file names the assistant).
    let default_title = format!("{} Notification", state.config.owner_name);
    let title = validate::text_field(body, "title", "Title", &default_title)?;
    let message = validate::text_field(body, "message", "Message", DEFAULT_MESSAGE)?;
    let voice_enabled = validate::optional_bool(body, "voice_enabled")?.unwrap_or(true);
    let voice_id = validate::optional_string(body, "voice_id")?;
    let voice_name = validate::optional_string(body, "voice_name")?;
    let request_settings = validate::voice_settings(body)?;
    let volume = validate::optional_number(body, "volume")?;

    // Desktop notification goes out regardless of the voice path and is
    // never awaited.
    send_desktop_notification(&title, &message);

    if voice_enabled {
        if let Some(request) = build_speech_request(
            state,
            &message,
            voice_id,
            voice_name,
            &request_settings,
            volume,
        ) {
            // Fire-and-forget: the completion receiver is dropped; queue
            // processing outcomes are logged by the worker.
            let _ = state.queue.enqueue(request);
        } else {
            debug!("Message empty after speech preparation, nothing to say");
        }
    }

    Ok(Json(StatusResponse {
        status: "success",
        message: "Notification sent",
    }))
}

/// Resolve voice, prosody and volume into a ready-to-queue request.
///
/// An explicit `voice_id` wins over `voice_name`; with neither, the
/// configured default voice and the DA identity's prosody apply. Merge
/// order is defaults → voice-config record → request overrides.
fn build_speech_request(
    state: &AppState,
    message: &str,
    voice_id: Option<String>,
    voice_name: Option<String>,
    request_settings: &ProsodyOverride,
    volume: Option<f32>,
) -> Option<SpeechRequest> {
    let text = prepare_speech_text(message, &state.pronunciations);
    if text.is_empty() {
        return None;
    }

    let catalog = &state.voices;
    let config = &state.config;

    let (resolved_id, persona, uses_default_voice) = if let Some(id) = voice_id {
        let persona = catalog.by_id(&id);
        (id, persona, false)
    } else if let Some(name) = &voice_name {
        let persona = catalog.by_name(name);
        let id = persona
            .and_then(|p| p.voice_id.clone())
            .unwrap_or_else(|| config.default_voice_id.clone());
        (id, persona, false)
    } else {
        (
            config.default_voice_id.clone(),
            catalog.by_id(&config.default_voice_id),
            true,
        )
    };

    let mut overrides: Vec<&ProsodyOverride> = Vec::new();
    if uses_default_voice {
        overrides.push(&config.identity_voice);
    }
    if let Some(persona) = persona {
        overrides.push(&persona.settings);
    }
    overrides.push(request_settings);

    let prosody = Prosody::merged(&overrides);
    let volume = resolve_volume(volume, &overrides);

    Some(SpeechRequest {
        text,
        voice_id: resolved_id,
        voice_name,
        prosody,
        volume,
    })
}
