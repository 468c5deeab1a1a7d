//! Start-up availability probes.
//!
//! Each probe answers one question: is this engine, speech tool or audio
//! player usable right now? Probes run once during bootstrap; their
//! results are cached in a [`ProbeReport`] for the daemon's lifetime and
//! never revised mid-run.

use std::time::Duration;

use tracing::{debug, info};

use paivoice_core::{AudioFormat, DaemonConfig};

/// How long the Qwen3 sidecar health probe may take.
const SIDECAR_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// An external audio player binary and how to drive it.
#[derive(Debug, Clone, Copy)]
pub struct PlayerCandidate {
    /// Binary name on PATH; also the application name the audio daemon
    /// reports for streams this player produces.
    pub name: &'static str,
    /// Fixed argv prefix before the volume args and the file path.
    pub args: &'static [&'static str],
    /// Maps a normalised volume in [0.0, 1.0] to extra argv, when the
    /// player supports volume at all.
    pub volume_args: Option<fn(f32) -> Vec<String>>,
}

fn afplay_volume(v: f32) -> Vec<String> {
    vec!["-v".to_string(), format!("{v:.2}")]
}

fn paplay_volume(v: f32) -> Vec<String> {
    // paplay volume is linear with 65536 = 100%.
    vec![format!("--volume={}", (v * 65536.0).round() as u32)]
}

fn mpv_volume(v: f32) -> Vec<String> {
    vec![format!("--volume={}", (v * 100.0).round() as u32)]
}

const AFPLAY: PlayerCandidate = PlayerCandidate {
    name: "afplay",
    args: &[],
    volume_args: Some(afplay_volume),
};

const PAPLAY: PlayerCandidate = PlayerCandidate {
    name: "paplay",
    args: &[],
    volume_args: Some(paplay_volume),
};

const MPV: PlayerCandidate = PlayerCandidate {
    name: "mpv",
    args: &["--really-quiet", "--no-video"],
    volume_args: Some(mpv_volume),
};

const APLAY: PlayerCandidate = PlayerCandidate {
    name: "aplay",
    args: &["-q"],
    volume_args: None,
};

const MPG123: PlayerCandidate = PlayerCandidate {
    name: "mpg123",
    args: &["-q"],
    volume_args: None,
};

/// Player candidates for a format, in probe priority order.
///
/// On macOS the built-in `afplay` handles both formats and is tried first.
/// For uncompressed audio the audio-daemon client wins over generic
/// players; for compressed audio a generic player or dedicated decoder is
/// preferred.
#[must_use]
pub fn player_candidates(format: AudioFormat) -> &'static [PlayerCandidate] {
    match format {
        AudioFormat::Uncompressed => {
            if cfg!(target_os = "macos") {
                &[AFPLAY, PAPLAY, MPV, APLAY]
            } else {
                &[PAPLAY, MPV, APLAY]
            }
        }
        AudioFormat::Compressed => {
            if cfg!(target_os = "macos") {
                &[AFPLAY, MPV, MPG123, PAPLAY]
            } else {
                &[MPV, MPG123, PAPLAY]
            }
        }
    }
}

/// A platform speech tool that synthesises and plays in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechTool {
    /// Binary name on PATH.
    pub name: &'static str,
    /// Fixed argv prefix.
    pub args: &'static [&'static str],
    /// Whether the text goes to stdin instead of argv.
    pub takes_stdin: bool,
}

/// Speech tool candidates in fixed priority order.
pub const SPEECH_TOOLS: &[SpeechTool] = &[
    SpeechTool {
        name: "say",
        args: &[],
        takes_stdin: false,
    },
    SpeechTool {
        name: "espeak-ng",
        args: &[],
        takes_stdin: false,
    },
    SpeechTool {
        name: "espeak",
        args: &[],
        takes_stdin: false,
    },
    SpeechTool {
        name: "festival",
        args: &["--tts"],
        takes_stdin: true,
    },
];

/// Cached probe outcomes, computed once at start-up.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Cloud credential is configured and not a placeholder.
    pub elevenlabs: bool,
    /// Resolved piper binary, when one is on PATH.
    pub piper_binary: Option<std::path::PathBuf>,
    /// The piper binary is on PATH and the voice model file exists.
    pub piper: bool,
    /// The Qwen3 sidecar answered its health endpoint.
    pub qwen3: bool,
    /// First available platform speech tool, if any.
    pub os_tts: Option<SpeechTool>,
    /// First available player for uncompressed audio.
    pub uncompressed_player: Option<PlayerCandidate>,
    /// First available player for compressed audio.
    pub compressed_player: Option<PlayerCandidate>,
}

impl ProbeReport {
    /// Run every probe synchronously (the sidecar probe awaits its
    /// 2-second HTTP deadline) and log the outcomes.
    pub async fn run(config: &DaemonConfig) -> Self {
        let piper_binary = which::which("piper").ok();
        let report = Self {
            elevenlabs: config.elevenlabs_configured(),
            piper: piper_available(piper_binary.as_deref(), &config.piper_model),
            piper_binary,
            qwen3: probe_qwen3(config.qwen3_port).await,
            os_tts: probe_speech_tool(),
            uncompressed_player: probe_player(AudioFormat::Uncompressed),
            compressed_player: probe_player(AudioFormat::Compressed),
        };

        if !report.elevenlabs {
            debug!("{}", paivoice_core::VoiceError::ConfigMissing("ELEVENLABS_API_KEY"));
        }

        info!(
            elevenlabs = report.elevenlabs,
            piper = report.piper,
            qwen3 = report.qwen3,
            os_tts = report.os_tts.map(|t| t.name),
            uncompressed_player = report.uncompressed_player.map(|p| p.name),
            compressed_player = report.compressed_player.map(|p| p.name),
            "Engine and player probes complete"
        );
        report
    }
}

/// Piper is usable when the binary is discoverable and the model file
/// exists. The binary is never executed here.
fn piper_available(binary: Option<&std::path::Path>, model: &std::path::Path) -> bool {
    if binary.is_none() {
        debug!("piper binary not on PATH");
        return false;
    }
    if !model.exists() {
        debug!(model = %model.display(), "piper model file missing");
        return false;
    }
    true
}

/// The sidecar is usable when its `/health` endpoint answers within the
/// probe deadline.
async fn probe_qwen3(port: u16) -> bool {
    let url = format!("http://127.0.0.1:{port}/health");
    let Ok(client) = reqwest::Client::builder()
        .timeout(SIDECAR_PROBE_TIMEOUT)
        .build()
    else {
        return false;
    };
    match client.get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(url = %url, error = %e, "Qwen3 sidecar not reachable");
            false
        }
    }
}

fn probe_speech_tool() -> Option<SpeechTool> {
    SPEECH_TOOLS
        .iter()
        .find(|tool| which::which(tool.name).is_ok())
        .copied()
}

fn probe_player(format: AudioFormat) -> Option<PlayerCandidate> {
    player_candidates(format)
        .iter()
        .find(|candidate| which::which(candidate.name).is_ok())
        .copied()
}
