//! Platform speech tool back-end.
//!
//! `say`, `espeak`, `espeak-ng` and `festival` synthesise and play in one
//! step, so this back-end returns no buffer and the audio player is never
//! involved.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use paivoice_core::VoiceError;

use crate::probe::SpeechTool;

/// Wrapper around the probed platform speech tool.
pub struct OsSpeaker {
    tool: SpeechTool,
}

impl OsSpeaker {
    #[must_use]
    pub const fn new(tool: SpeechTool) -> Self {
        Self { tool }
    }

    /// Name of the underlying tool (health reporting).
    #[must_use]
    pub const fn tool_name(&self) -> &'static str {
        self.tool.name
    }

    /// Speak the text and return once the tool exits.
    pub async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        debug!(tool = self.tool.name, chars = text.len(), "OS speech tool");

        let mut cmd = Command::new(self.tool.name);
        cmd.args(self.tool.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = if self.tool.takes_stdin {
            cmd.stdin(Stdio::piped());
            let mut child = cmd.spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes()).await?;
                drop(stdin);
            }
            child.wait_with_output().await?
        } else {
            cmd.arg(text);
            cmd.stdin(Stdio::null());
            cmd.spawn()?.wait_with_output().await?
        };

        if !output.status.success() {
            return Err(VoiceError::EngineExit {
                engine: "os-tts",
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The real tools are platform-provided; exercise the argv/stdin split
    // with stand-ins.
    #[cfg(unix)]
    fn stub_tool(name: &'static str, args: &'static [&'static str], takes_stdin: bool) -> SpeechTool {
        SpeechTool {
            name,
            args,
            takes_stdin,
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn argv_tool_succeeds() {
        // `true` ignores its argv and exits 0, standing in for `say`.
        let speaker = OsSpeaker::new(stub_tool("true", &[], false));
        speaker.speak("hello there").await.unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn stdin_tool_consumes_text() {
        // `cat` reads stdin to EOF and exits 0, standing in for festival.
        let speaker = OsSpeaker::new(stub_tool("cat", &[], true));
        speaker.speak("hello there").await.unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn nonzero_exit_is_engine_exit() {
        let speaker = OsSpeaker::new(stub_tool("false", &[], false));
        let err = speaker.speak("hello").await.unwrap_err();
        assert!(matches!(
            err,
            VoiceError::EngineExit { engine: "os-tts", .. }
        ));
    }
}
