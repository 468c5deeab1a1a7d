//! External-audio coordination.
//!
//! Immediately before each queued item is processed, the platform audio
//! daemon is asked for its active streams. A stream produced by our own
//! player on one of our `voice-*` temp files is ignored; any other stream
//! means the user is listening to something, and the notification is
//! dropped rather than talked over. The check fails open: when the query
//! itself fails (or the platform has no such query), playback proceeds.

use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::player::TEMP_PREFIX;

/// Deadline for the stream-listing query.
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// One active playback stream as reported by the audio daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkStream {
    /// Producing application name (`application.name`).
    pub application: String,
    /// Media name, typically the file path for file players (`media.name`).
    pub media: String,
}

impl SinkStream {
    /// Whether this stream belongs to the daemon: produced by our
    /// uncompressed player and playing one of our `voice-*` WAV files.
    #[must_use]
    pub fn is_own(&self, player_name: &str) -> bool {
        self.application == player_name
            && self.media.contains(TEMP_PREFIX)
            && self.media.ends_with(".wav")
    }
}

/// Whether any foreign audio stream is currently active.
///
/// `player_name` is the probed uncompressed player; pass `None` when no
/// player probed available (every stream then counts as foreign).
pub async fn external_audio_active(player_name: Option<&str>) -> bool {
    if which::which("pactl").is_err() {
        // No stream query exists on this platform; always proceed.
        return false;
    }

    let listing = tokio::time::timeout(
        QUERY_TIMEOUT,
        Command::new("pactl").args(["list", "sink-inputs"]).output(),
    )
    .await;

    let output = match listing {
        Ok(Ok(output)) if output.status.success() => output.stdout,
        Ok(Ok(output)) => {
            debug!(code = ?output.status.code(), "pactl query failed, proceeding");
            return false;
        }
        Ok(Err(e)) => {
            debug!(error = %e, "pactl could not be spawned, proceeding");
            return false;
        }
        Err(_) => {
            debug!("pactl query timed out, proceeding");
            return false;
        }
    };

    let streams = parse_sink_inputs(&String::from_utf8_lossy(&output));
    has_foreign_stream(&streams, player_name)
}

/// Classify the parsed streams against our own player.
#[must_use]
pub fn has_foreign_stream(streams: &[SinkStream], player_name: Option<&str>) -> bool {
    streams
        .iter()
        .any(|stream| !player_name.is_some_and(|name| stream.is_own(name)))
}

/// Parse `pactl list sink-inputs` output into streams.
///
/// Each stream is introduced by a `Sink Input #N` header; the properties
/// of interest appear as `application.name = "…"` and `media.name = "…"`
/// lines inside the block.
#[must_use]
pub fn parse_sink_inputs(output: &str) -> Vec<SinkStream> {
    let mut streams = Vec::new();
    let mut application = None;
    let mut media = None;

    let mut flush = |application: &mut Option<String>, media: &mut Option<String>| {
        if application.is_some() || media.is_some() {
            streams.push(SinkStream {
                application: application.take().unwrap_or_default(),
                media: media.take().unwrap_or_default(),
            });
        }
    };

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Sink Input #") {
            flush(&mut application, &mut media);
        } else if let Some(value) = quoted_property(trimmed, "application.name") {
            application = Some(value);
        } else if let Some(value) = quoted_property(trimmed, "media.name") {
            media = Some(value);
        }
    }
    flush(&mut application, &mut media);
    streams
}

/// Extract the quoted value of a `key = "value"` property line.
fn quoted_property(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?.trim_start().strip_prefix('=')?;
    let rest = rest.trim();
    let rest = rest.strip_prefix('"')?;
    let end = rest.rfind('"')?;
    Some(rest[..end].to_string())
}
