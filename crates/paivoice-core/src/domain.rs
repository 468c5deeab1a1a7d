//! Core domain types: engines, audio formats and prosody.
//!
//! These are pure value types with no infrastructure dependencies. The
//! engine set is closed; runtime dispatch and the fallback chain iterate
//! over these variants rather than strings.

use serde::{Deserialize, Serialize};

/// A speech synthesis engine the daemon can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// ElevenLabs cloud TTS (network, compressed audio).
    ElevenLabs,
    /// Piper neural TTS binary (local CPU, uncompressed audio).
    Piper,
    /// Qwen3 TTS over a local HTTP sidecar (GPU, uncompressed audio).
    Qwen3,
    /// Platform speech tool (`say`, `espeak`, …) that plays directly.
    OsTts,
}

impl Engine {
    /// Human description used in health reporting and logs.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ElevenLabs => "ElevenLabs cloud voice",
            Self::Piper => "Piper neural TTS (CPU)",
            Self::Qwen3 => "Qwen3 neural TTS (GPU sidecar)",
            Self::OsTts => "OS speech tool",
        }
    }

    /// Short lowercase label for log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ElevenLabs => "elevenlabs",
            Self::Piper => "piper",
            Self::Qwen3 => "qwen3",
            Self::OsTts => "os-tts",
        }
    }

    /// The audio format this engine produces, or `None` when the engine
    /// plays directly and hands nothing to the player.
    #[must_use]
    pub const fn output_format(self) -> Option<AudioFormat> {
        match self {
            Self::ElevenLabs => Some(AudioFormat::Compressed),
            Self::Piper | Self::Qwen3 => Some(AudioFormat::Uncompressed),
            Self::OsTts => None,
        }
    }

    /// Parse a `PAI_TTS_ENGINE` preference value.
    ///
    /// Only local engines can be requested explicitly; anything else
    /// (including the cloud engine) is `None`.
    #[must_use]
    pub fn parse_preference(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "piper" => Some(Self::Piper),
            "qwen3" => Some(Self::Qwen3),
            _ => None,
        }
    }
}

/// The two audio container distinctions the player honours.
///
/// File extensions on temporary files and the choice of player binary
/// follow from this tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Lossy compressed audio (MP3 from the cloud engine).
    Compressed,
    /// Raw PCM in a WAV container (local neural engines).
    Uncompressed,
}

impl AudioFormat {
    /// File extension for temporary audio files of this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Compressed => "mp3",
            Self::Uncompressed => "wav",
        }
    }

    /// Label used in logs and errors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compressed => "compressed",
            Self::Uncompressed => "uncompressed",
        }
    }
}

/// Voice character parameters sent to the cloud engine.
///
/// Every field always has a defined value; partial overrides are expressed
/// through [`ProsodyOverride`] and applied on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub speed: f32,
    pub use_speaker_boost: bool,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            speed: 1.0,
            use_speaker_boost: true,
        }
    }
}

impl Prosody {
    /// Apply a partial override, replacing only the fields it supplies.
    pub fn apply(&mut self, other: &ProsodyOverride) {
        if let Some(v) = other.stability {
            self.stability = v;
        }
        if let Some(v) = other.similarity_boost {
            self.similarity_boost = v;
        }
        if let Some(v) = other.style {
            self.style = v;
        }
        if let Some(v) = other.speed {
            self.speed = v;
        }
        if let Some(v) = other.use_speaker_boost {
            self.use_speaker_boost = v;
        }
    }

    /// Merge defaults with a stack of overrides, later entries winning.
    #[must_use]
    pub fn merged(overrides: &[&ProsodyOverride]) -> Self {
        let mut prosody = Self::default();
        for o in overrides {
            prosody.apply(o);
        }
        prosody
    }
}

/// Partial prosody: the per-request `voice_settings` shape and the prosody
/// record stored in voice-config entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProsodyOverride {
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub speed: Option<f32>,
    pub use_speaker_boost: Option<bool>,
    /// Playback volume in [0.0, 1.0]; consumed by the player, not the engine.
    pub volume: Option<f32>,
}

/// Resolve the playback volume for a request.
///
/// Precedence: explicit request volume, then the merged settings volume,
/// then full volume. The result is clamped to [0.0, 1.0].
#[must_use]
pub fn resolve_volume(request: Option<f32>, overrides: &[&ProsodyOverride]) -> f32 {
    let from_settings = overrides.iter().rev().find_map(|o| o.volume);
    request.or(from_settings).unwrap_or(1.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prosody_defaults() {
        let p = Prosody::default();
        assert!((p.stability - 0.5).abs() < f32::EPSILON);
        assert!((p.similarity_boost - 0.75).abs() < f32::EPSILON);
        assert!((p.style - 0.0).abs() < f32::EPSILON);
        assert!((p.speed - 1.0).abs() < f32::EPSILON);
        assert!(p.use_speaker_boost);
    }

    #[test]
    fn override_replaces_only_supplied_fields() {
        let voice_config = ProsodyOverride {
            stability: Some(0.9),
            volume: Some(0.4),
            ..ProsodyOverride::default()
        };
        let request = ProsodyOverride {
            speed: Some(1.2),
            ..ProsodyOverride::default()
        };

        let merged = Prosody::merged(&[&voice_config, &request]);
        assert!((merged.stability - 0.9).abs() < f32::EPSILON);
        assert!((merged.speed - 1.2).abs() < f32::EPSILON);
        // Untouched fields keep their defaults.
        assert!((merged.similarity_boost - 0.75).abs() < f32::EPSILON);
        assert!(merged.use_speaker_boost);
    }

    #[test]
    fn request_override_wins_over_voice_config() {
        let voice_config = ProsodyOverride {
            stability: Some(0.2),
            ..ProsodyOverride::default()
        };
        let request = ProsodyOverride {
            stability: Some(0.8),
            ..ProsodyOverride::default()
        };
        let merged = Prosody::merged(&[&voice_config, &request]);
        assert!((merged.stability - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn volume_precedence_and_clamping() {
        let cfg = ProsodyOverride {
            volume: Some(0.3),
            ..ProsodyOverride::default()
        };
        assert!((resolve_volume(Some(0.7), &[&cfg]) - 0.7).abs() < f32::EPSILON);
        assert!((resolve_volume(None, &[&cfg]) - 0.3).abs() < f32::EPSILON);
        assert!((resolve_volume(None, &[]) - 1.0).abs() < f32::EPSILON);
        assert!((resolve_volume(Some(4.2), &[]) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn engine_preference_parsing() {
        assert_eq!(Engine::parse_preference("piper"), Some(Engine::Piper));
        assert_eq!(Engine::parse_preference(" QWEN3 "), Some(Engine::Qwen3));
        assert_eq!(Engine::parse_preference("elevenlabs"), None);
        assert_eq!(Engine::parse_preference(""), None);
    }

    #[test]
    fn os_tts_has_no_output_format() {
        assert_eq!(Engine::OsTts.output_format(), None);
        assert_eq!(
            Engine::ElevenLabs.output_format(),
            Some(AudioFormat::Compressed)
        );
    }
}
