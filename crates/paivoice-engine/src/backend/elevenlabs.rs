//! ElevenLabs cloud back-end.
//!
//! One HTTPS POST per request; the client's default timeout applies and
//! there are no retries. Produces MP3 bytes.

use async_trait::async_trait;
use tracing::debug;

use paivoice_core::{AudioFormat, Prosody, VoiceError};

use super::{SpeechBackend, SpeechRequest, TtsAudio};

/// Model requested from the API.
const MODEL_ID: &str = "eleven_turbo_v2_5";

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsBackend {
    /// Create a backend for the production API.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.elevenlabs.io".to_string())
    }

    /// Create a backend against an explicit host (tests).
    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

/// Exact field mapping expected by the API.
fn request_body(text: &str, prosody: &Prosody) -> serde_json::Value {
    serde_json::json!({
        "text": text,
        "model_id": MODEL_ID,
        "voice_settings": {
            "stability": prosody.stability,
            "similarity_boost": prosody.similarity_boost,
            "style": prosody.style,
            "speed": prosody.speed,
            "use_speaker_boost": prosody.use_speaker_boost,
        },
    })
}

#[async_trait]
impl SpeechBackend for ElevenLabsBackend {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<TtsAudio, VoiceError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            request.voice_id
        );
        debug!(voice_id = %request.voice_id, chars = request.text.len(), "ElevenLabs synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request_body(&request.text, &request.prosody))
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::UpstreamRejected {
                engine: "elevenlabs",
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
            format: AudioFormat::Compressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_all_prosody_fields() {
        let prosody = Prosody {
            stability: 0.6,
            similarity_boost: 0.8,
            style: 0.1,
            speed: 1.2,
            use_speaker_boost: false,
        };
        let body = request_body("Build complete", &prosody);

        assert_eq!(body["text"], "Build complete");
        assert_eq!(body["model_id"], MODEL_ID);
        let vs = &body["voice_settings"];
        assert_eq!(vs["stability"], 0.6_f32);
        assert_eq!(vs["similarity_boost"], 0.8_f32);
        assert_eq!(vs["style"], 0.1_f32);
        assert_eq!(vs["speed"], 1.2_f32);
        assert_eq!(vs["use_speaker_boost"], false);
    }
}
