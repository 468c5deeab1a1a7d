//! External audio playback.
//!
//! Synthesised bytes are written to a uniquely named temporary file and
//! handed to the probed player binary for the format. The `voice-` file
//! name prefix identifies this daemon's own streams to the external-audio
//! check, so it must never change. The file is removed on every exit path
//! of the player's lifecycle.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::process::Command;
use tracing::debug;

use paivoice_core::{AudioFormat, VoiceError};

use crate::probe::PlayerCandidate;

/// File name prefix of daemon-owned temporary audio files.
pub const TEMP_PREFIX: &str = "voice-";

static FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Plays audio buffers through the players cached at probe time.
pub struct AudioPlayer {
    uncompressed: Option<PlayerCandidate>,
    compressed: Option<PlayerCandidate>,
    temp_dir: PathBuf,
}

/// Removes the temporary audio file on drop; covers success, player
/// failure and spawn errors alike.
struct TempAudio {
    path: PathBuf,
}

impl TempAudio {
    async fn write(dir: &std::path::Path, format: AudioFormat, bytes: &[u8]) -> Result<Self, VoiceError> {
        let seq = FILE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{TEMP_PREFIX}{}-{seq}.{}",
            std::process::id(),
            format.extension()
        );
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl AudioPlayer {
    /// Build a player from the probed candidates, writing temp files to
    /// the system temp directory.
    #[must_use]
    pub fn new(
        uncompressed: Option<PlayerCandidate>,
        compressed: Option<PlayerCandidate>,
    ) -> Self {
        Self {
            uncompressed,
            compressed,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Override the temp directory (tests).
    #[must_use]
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Name of the player used for uncompressed audio, when one probed
    /// available. The external-audio check compares stream application
    /// names against it.
    #[must_use]
    pub fn uncompressed_player_name(&self) -> Option<&'static str> {
        self.uncompressed.map(|c| c.name)
    }

    const fn candidate_for(&self, format: AudioFormat) -> Option<PlayerCandidate> {
        match format {
            AudioFormat::Uncompressed => self.uncompressed,
            AudioFormat::Compressed => self.compressed,
        }
    }

    /// Write the buffer to a temp file, play it, wait for the player to
    /// exit and remove the file.
    pub async fn play(
        &self,
        bytes: &[u8],
        format: AudioFormat,
        volume: f32,
    ) -> Result<(), VoiceError> {
        let candidate = self
            .candidate_for(format)
            .ok_or(VoiceError::NoPlayer(format.label()))?;

        let temp = TempAudio::write(&self.temp_dir, format, bytes).await?;
        debug!(
            player = candidate.name,
            file = %temp.path.display(),
            bytes = bytes.len(),
            "Playing audio"
        );

        let mut cmd = Command::new(candidate.name);
        cmd.args(candidate.args);
        if let Some(volume_args) = candidate.volume_args {
            cmd.args(volume_args(volume));
        }
        cmd.arg(&temp.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let status = cmd.status().await.map_err(|e| VoiceError::PlaybackFailed {
            player: format!("{} ({e})", candidate.name),
            code: None,
        })?;

        if !status.success() {
            return Err(VoiceError::PlaybackFailed {
                player: candidate.name.to_string(),
                code: status.code(),
            });
        }
        Ok(())
        // `temp` drops here and on every early return above.
    }
}
