//! Qwen3 GPU sidecar back-end.
//!
//! The sidecar is a separate process owning the GPU; the daemon talks to
//! it over loopback HTTP. Per-utterance latency is seconds, which is why
//! dispatch runs this engine through the progressive pipeline.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use paivoice_core::{AudioFormat, VoiceError};

use super::{SpeechBackend, SpeechRequest, TtsAudio};

/// Per-call synthesis deadline.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Speaker used when the request names no voice.
const DEFAULT_SPEAKER: &str = "Ryan";

/// Style directive used when the caller supplies none.
const DEFAULT_INSTRUCT: &str =
    "Speak in a stable, professional tone. Read numbers and abbreviations naturally.";

/// Client for the local Qwen3 TTS sidecar.
pub struct QwenBackend {
    client: reqwest::Client,
    base_url: String,
}

impl QwenBackend {
    /// Create a client for the sidecar on the given loopback port.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{port}"))
    }

    /// Create a client against an explicit host (tests).
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

fn request_body(text: &str, speaker: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "text": text,
        "speaker": speaker.unwrap_or(DEFAULT_SPEAKER),
        "instruct": DEFAULT_INSTRUCT,
        "language": "en",
    })
}

#[async_trait]
impl SpeechBackend for QwenBackend {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<TtsAudio, VoiceError> {
        let url = format!("{}/tts/generate", self.base_url.trim_end_matches('/'));
        debug!(chars = request.text.len(), "qwen3 synthesis");

        let response = self
            .client
            .post(&url)
            .timeout(SYNTHESIS_TIMEOUT)
            .json(&request_body(&request.text, request.voice_name.as_deref()))
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::UpstreamRejected {
                engine: "qwen3",
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        Ok(TtsAudio {
            bytes: bytes.to_vec(),
            format: AudioFormat::Uncompressed,
        })
    }
}
