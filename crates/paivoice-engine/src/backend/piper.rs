//! Piper local neural back-end.
//!
//! Spawns the piper binary per request, feeds the text on stdin and reads
//! the WAV it writes to a scratch file. The scratch file never outlives
//! the call, on any path.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use paivoice_core::{AudioFormat, VoiceError};

use super::{SpeechBackend, SpeechRequest, TtsAudio};

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Piper subprocess wrapper.
pub struct PiperBackend {
    binary: PathBuf,
    model: PathBuf,
}

impl PiperBackend {
    #[must_use]
    pub fn new(binary: PathBuf, model: PathBuf) -> Self {
        Self { binary, model }
    }

    fn scratch_path() -> PathBuf {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("piper-{}-{seq}.wav", std::process::id()))
    }
}

/// Removes the scratch file on drop so no exit path leaks it.
struct ScratchGuard(PathBuf);

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[async_trait]
impl SpeechBackend for PiperBackend {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<TtsAudio, VoiceError> {
        let out_path = Self::scratch_path();
        let guard = ScratchGuard(out_path.clone());

        debug!(model = %self.model.display(), chars = request.text.len(), "piper synthesis");

        let mut child = Command::new(&self.binary)
            .arg("-m")
            .arg(&self.model)
            .arg("-f")
            .arg(&out_path)
            .arg("-q")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.text.as_bytes()).await?;
            // Closing stdin signals end of input.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(VoiceError::EngineExit {
                engine: "piper",
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let bytes = tokio::fs::read(&out_path).await.map_err(|e| {
            VoiceError::Synthesis(format!("piper produced no output file: {e}"))
        })?;
        drop(guard);

        Ok(TtsAudio {
            bytes,
            format: AudioFormat::Uncompressed,
        })
    }
}
