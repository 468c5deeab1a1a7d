//! Daemon configuration loading.
//!
//! Configuration is assembled once at start-up from two files and never
//! revised mid-run:
//!
//! - the env file (`~/.env`): `KEY=VALUE` lines, `#` comments, surrounding
//!   quotes stripped — parsed with `dotenvy` without touching the process
//!   environment;
//! - the structured settings file (`<pai_dir>/settings.json`): the DA
//!   identity (name, voice id, prosody) and `reducedVoiceFeedback`.
//!
//! Missing files are not errors; every field has a defined default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Engine, ProsodyOverride};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8888;

/// Default port of the Qwen3 TTS sidecar.
pub const DEFAULT_QWEN3_PORT: u16 = 8001;

/// Voice used when neither the env file nor the identity names one.
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Piper voice model used when `PIPER_MODEL` is unset.
pub const DEFAULT_PIPER_MODEL: &str = "en_US-lessac-medium.onnx";

/// Display name used in notification titles when the identity has none.
pub const DEFAULT_OWNER_NAME: &str = "PAI";

/// Immutable configuration snapshot for the daemon's lifetime.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// HTTP port to bind on localhost.
    pub port: u16,
    /// Data directory holding settings, voices and pronunciations.
    pub pai_dir: PathBuf,
    /// ElevenLabs API credential, if any.
    pub elevenlabs_api_key: Option<String>,
    /// Explicitly requested local engine (`PAI_TTS_ENGINE`).
    pub preferred_engine: Option<Engine>,
    /// Resolved path of the Piper voice model file.
    pub piper_model: PathBuf,
    /// Port of the Qwen3 sidecar on loopback.
    pub qwen3_port: u16,
    /// Voice selected when a request names none.
    pub default_voice_id: String,
    /// DA display name (used by desktop notifications).
    pub owner_name: String,
    /// Prosody overrides from the DA identity, applied under request overrides.
    pub identity_voice: ProsodyOverride,
    /// Callers suppress non-essential notifications when set; the daemon
    /// only surfaces it.
    pub reduced_voice_feedback: bool,
}

impl DaemonConfig {
    /// Load configuration from the default locations (`~/.env`, `~/.pai`).
    #[must_use]
    pub fn load() -> Self {
        let env_file = dirs::home_dir().map(|h| h.join(".env"));
        Self::load_from(env_file.as_deref(), None)
    }

    /// Load configuration with explicit file locations (CLI overrides).
    #[must_use]
    pub fn load_from(env_file: Option<&Path>, pai_dir: Option<&Path>) -> Self {
        let env = env_file.map(read_env_file).unwrap_or_default();

        let pai_dir = pai_dir.map_or_else(
            || {
                env_value(&env, "PAI_DIR").map_or_else(default_pai_dir, PathBuf::from)
            },
            Path::to_path_buf,
        );

        let settings = read_settings_file(&pai_dir.join("settings.json"));
        let identity = settings.daidentity.unwrap_or_default();

        let port = env_value(&env, "PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let preferred_engine = env_value(&env, "PAI_TTS_ENGINE").and_then(|v| {
            let engine = Engine::parse_preference(&v);
            if engine.is_none() {
                warn!(value = %v, "Unrecognised PAI_TTS_ENGINE, ignoring");
            }
            engine
        });

        let piper_model = resolve_piper_model(&env, &pai_dir);

        let qwen3_port = env_value(&env, "QWEN3_INTERNAL_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_QWEN3_PORT);

        let default_voice_id = env_value(&env, "ELEVENLABS_VOICE_ID")
            .or(identity.voice_id)
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());

        let owner_name = identity
            .name
            .unwrap_or_else(|| DEFAULT_OWNER_NAME.to_string());

        Self {
            port,
            pai_dir,
            elevenlabs_api_key: env_value(&env, "ELEVENLABS_API_KEY"),
            preferred_engine,
            piper_model,
            qwen3_port,
            default_voice_id,
            owner_name,
            identity_voice: identity.voice.unwrap_or_default(),
            reduced_voice_feedback: settings.reduced_voice_feedback,
        }
    }

    /// Whether the cloud credential is usable (non-empty, not a placeholder).
    #[must_use]
    pub fn elevenlabs_configured(&self) -> bool {
        self.elevenlabs_api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty() && !is_placeholder(key))
    }

    /// Path of the voices markdown file.
    #[must_use]
    pub fn voices_path(&self) -> PathBuf {
        self.pai_dir.join("voices.md")
    }

    /// Path of the pronunciations file.
    #[must_use]
    pub fn pronunciations_path(&self) -> PathBuf {
        self.pai_dir.join("pronunciations.json")
    }
}

/// A key looks like a placeholder when it was copied from a template
/// without being filled in.
fn is_placeholder(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("your_") || lower.contains("_here")
}

fn default_pai_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pai")
}

/// Parse the env file into a map without mutating the process environment.
fn read_env_file(path: &Path) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            for item in iter {
                match item {
                    Ok((key, value)) => {
                        map.insert(key, value);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping malformed env line");
                    }
                }
            }
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No env file loaded");
        }
    }
    map
}

/// Look up a key in the env file, ignoring empty values.
fn env_value(env: &BTreeMap<String, String>, key: &str) -> Option<String> {
    env.get(key).cloned().filter(|v| !v.is_empty())
}

/// Resolve the Piper model path: `PIPER_MODEL` may be absolute or a bare
/// file name under `PIPER_MODEL_DIR` (default `<pai_dir>/models`).
fn resolve_piper_model(env: &BTreeMap<String, String>, pai_dir: &Path) -> PathBuf {
    let model = env_value(env, "PIPER_MODEL").unwrap_or_else(|| DEFAULT_PIPER_MODEL.to_string());
    let model = PathBuf::from(model);
    if model.is_absolute() {
        return model;
    }
    let dir = env_value(env, "PIPER_MODEL_DIR")
        .map_or_else(|| pai_dir.join("models"), PathBuf::from);
    dir.join(model)
}

// ── Settings file shapes ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    daidentity: Option<DaIdentity>,
    #[serde(rename = "reducedVoiceFeedback")]
    reduced_voice_feedback: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaIdentity {
    #[serde(rename = "voiceId")]
    voice_id: Option<String>,
    name: Option<String>,
    voice: Option<ProsodyOverride>,
}

fn read_settings_file(path: &Path) -> SettingsFile {
    let Ok(contents) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "No settings file, using defaults");
        return SettingsFile::default();
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable settings file, using defaults");
            SettingsFile::default()
        }
    }
}
