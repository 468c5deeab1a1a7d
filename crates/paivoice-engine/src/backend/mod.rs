//! TTS back-ends.
//!
//! Every buffer-producing engine implements [`SpeechBackend`]: text plus a
//! resolved voice in, audio bytes of a known format out. The platform
//! speech tool is the odd one out — it plays directly and lives in
//! [`os_tts`] behind its own `speak` call.

pub mod elevenlabs;
pub mod os_tts;
pub mod piper;
pub mod qwen;

use async_trait::async_trait;

use paivoice_core::{AudioFormat, Prosody, VoiceError};

pub use elevenlabs::ElevenLabsBackend;
pub use os_tts::OsSpeaker;
pub use piper::PiperBackend;
pub use qwen::QwenBackend;

/// A fully resolved synthesis request, after voice-config lookup and
/// prosody merging.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Sanitised, pronunciation-adjusted text to speak.
    pub text: String,
    /// Upstream voice identifier for the cloud engine.
    pub voice_id: String,
    /// Human voice name, when the caller supplied one (used as the
    /// sidecar speaker).
    pub voice_name: Option<String>,
    /// Merged prosody (defaults → voice config → request overrides).
    pub prosody: Prosody,
    /// Playback volume in [0.0, 1.0].
    pub volume: f32,
}

/// Synthesised audio with its container format.
#[derive(Debug, Clone)]
pub struct TtsAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

/// A buffer-producing TTS engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Render the request to an in-memory audio buffer.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<TtsAudio, VoiceError>;
}
