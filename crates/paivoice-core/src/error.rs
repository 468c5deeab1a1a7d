//! Voice daemon error types.

/// Errors that can occur while handling a notification.
///
/// Everything here carries a human-readable message plus enough data to log;
/// none of these abort the daemon. Validation errors surface as HTTP 400,
/// rate limiting as 429, and everything downstream of the queue is logged
/// and swallowed after the fallback chain has run.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// A request field failed validation.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Too many requests from one client inside the window.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// An HTTP back-end (ElevenLabs, Qwen3 sidecar) returned a non-success status.
    #[error("{engine} rejected the request ({status}): {body}")]
    UpstreamRejected {
        engine: &'static str,
        status: u16,
        body: String,
    },

    /// A subprocess back-end exited non-zero.
    #[error("{engine} exited with code {code:?}: {stderr}")]
    EngineExit {
        engine: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// The external audio player exited non-zero or could not be spawned.
    #[error("Playback via {player} failed with code {code:?}")]
    PlaybackFailed { player: String, code: Option<i32> },

    /// A configuration key a back-end needs is absent.
    ///
    /// Logged at start-up; the affected back-end becomes unavailable.
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    /// The engine was asked to speak but did not probe available.
    #[error("{0} engine is not available")]
    EngineUnavailable(&'static str),

    /// No playback candidate was found for the audio format.
    #[error("No audio player available for {0} audio")]
    NoPlayer(&'static str),

    /// Synthesis failed for a reason other than an upstream rejection
    /// (network error, timeout, missing output file).
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// IO error (temp files, model files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
