//! Engine selection and runtime dispatch.
//!
//! The engine is chosen exactly once, after the start-up probes, and the
//! choice is never revised mid-run. Per request, dispatch routes to the
//! selected engine; on failure it walks the local fallback chain once,
//! engine by engine, using the cached probe results. Nothing here
//! propagates to the HTTP caller — a notification that cannot be spoken
//! resolves quietly.

use tracing::{info, warn};

use paivoice_core::{AudioFormat, DaemonConfig, Engine, VoiceError, split_sentences};

use crate::backend::{
    ElevenLabsBackend, OsSpeaker, PiperBackend, QwenBackend, SpeechBackend, SpeechRequest,
};
use crate::player::AudioPlayer;
use crate::probe::ProbeReport;
use crate::progressive::run_progressive;
use crate::queue::SpeechSink;

/// Local engines tried, in order, after the primary engine fails.
const FALLBACK_CHAIN: [Engine; 3] = [Engine::Piper, Engine::Qwen3, Engine::OsTts];

/// Routes requests to the selected engine and the audio player.
pub struct SpeechDispatcher {
    selection: Engine,
    elevenlabs: Option<Box<dyn SpeechBackend>>,
    piper: Option<Box<dyn SpeechBackend>>,
    qwen: Option<Box<dyn SpeechBackend>>,
    os: Option<OsSpeaker>,
    player: AudioPlayer,
}

/// Pick the engine for the daemon's lifetime.
///
/// The cloud engine outranks everything when its credential is present.
/// An explicitly requested local engine wins when its probe succeeded and
/// degrades to auto-detection with a warning when it did not. Auto
/// detection walks piper, qwen3, then the OS tool; with nothing available
/// the OS tool is still selected so requests fail soft.
fn select_engine(config: &DaemonConfig, report: &ProbeReport) -> Engine {
    if report.elevenlabs {
        return Engine::ElevenLabs;
    }

    if let Some(preferred) = config.preferred_engine {
        match preferred {
            Engine::Piper if report.piper => return Engine::Piper,
            Engine::Qwen3 if report.qwen3 => return Engine::Qwen3,
            other => {
                warn!(
                    engine = other.label(),
                    "Requested engine is not available, auto-detecting"
                );
            }
        }
    }

    if report.piper {
        Engine::Piper
    } else if report.qwen3 {
        Engine::Qwen3
    } else {
        if report.os_tts.is_none() {
            warn!("No speech engine available; speech requests will be dropped");
        }
        Engine::OsTts
    }
}

impl SpeechDispatcher {
    /// Build the dispatcher from the configuration and cached probes.
    ///
    /// Back-ends are instantiated only for engines whose probes passed;
    /// the fallback chain later skips the rest without re-probing.
    #[must_use]
    pub fn new(config: &DaemonConfig, report: &ProbeReport) -> Self {
        let selection = select_engine(config, report);
        info!(
            engine = selection.label(),
            description = selection.description(),
            "Speech engine selected"
        );

        let elevenlabs: Option<Box<dyn SpeechBackend>> = if report.elevenlabs {
            config
                .elevenlabs_api_key
                .clone()
                .map(|key| Box::new(ElevenLabsBackend::new(key)) as Box<dyn SpeechBackend>)
        } else {
            None
        };

        let piper: Option<Box<dyn SpeechBackend>> = if report.piper {
            report.piper_binary.clone().map(|binary| {
                Box::new(PiperBackend::new(binary, config.piper_model.clone()))
                    as Box<dyn SpeechBackend>
            })
        } else {
            None
        };

        let qwen: Option<Box<dyn SpeechBackend>> = report
            .qwen3
            .then(|| Box::new(QwenBackend::new(config.qwen3_port)) as Box<dyn SpeechBackend>);

        Self {
            selection,
            elevenlabs,
            piper,
            qwen,
            os: report.os_tts.map(OsSpeaker::new),
            player: AudioPlayer::new(report.uncompressed_player, report.compressed_player),
        }
    }

    /// The engine cached at start-up.
    #[must_use]
    pub const fn selection(&self) -> Engine {
        self.selection
    }

    /// Name of the player the external-audio check compares against.
    #[must_use]
    pub fn playback_application(&self) -> Option<&'static str> {
        self.player.uncompressed_player_name()
    }

    /// Speak one request: primary engine first, then one pass over the
    /// fallback chain. Returns the final error only when every engine
    /// failed; callers log it and resolve the request regardless.
    pub async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        match self.try_engine(self.selection, request).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    engine = self.selection.label(),
                    error = %e,
                    "Primary engine failed, trying fallback chain"
                );
            }
        }

        for engine in FALLBACK_CHAIN {
            if engine == self.selection {
                continue;
            }
            match self.try_engine(engine, request).await {
                Ok(()) => {
                    info!(engine = engine.label(), "Fallback engine spoke the message");
                    return Ok(());
                }
                Err(VoiceError::EngineUnavailable(_)) => {}
                Err(e) => {
                    warn!(engine = engine.label(), error = %e, "Fallback engine failed");
                }
            }
        }

        Err(VoiceError::Synthesis(
            "all speech engines failed".to_string(),
        ))
    }

    async fn try_engine(
        &self,
        engine: Engine,
        request: &SpeechRequest,
    ) -> Result<(), VoiceError> {
        match engine {
            Engine::ElevenLabs => {
                let backend = self
                    .elevenlabs
                    .as_deref()
                    .ok_or(VoiceError::EngineUnavailable("elevenlabs"))?;
                let audio = backend.synthesize(request).await?;
                self.player
                    .play(&audio.bytes, audio.format, request.volume)
                    .await
            }
            Engine::Piper => {
                let backend = self
                    .piper
                    .as_deref()
                    .ok_or(VoiceError::EngineUnavailable("piper"))?;
                let audio = backend.synthesize(request).await?;
                self.player
                    .play(&audio.bytes, audio.format, request.volume)
                    .await
            }
            Engine::Qwen3 => self.speak_progressive(request).await,
            Engine::OsTts => {
                let speaker = self
                    .os
                    .as_ref()
                    .ok_or(VoiceError::EngineUnavailable("os-tts"))?;
                speaker.speak(&request.text).await
            }
        }
    }

    /// Qwen3 path: split into sentences and pipeline generation against
    /// playback. A single-sentence message takes the plain path.
    async fn speak_progressive(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        let backend = self
            .qwen
            .as_deref()
            .ok_or(VoiceError::EngineUnavailable("qwen3"))?;

        let sentences = split_sentences(&request.text);
        if sentences.len() <= 1 {
            let audio = backend.synthesize(request).await?;
            return self
                .player
                .play(&audio.bytes, audio.format, request.volume)
                .await;
        }

        let player = &self.player;
        let volume = request.volume;

        let played = run_progressive(
            &sentences,
            move |index, text| {
                let mut sentence_request = request.clone();
                async move {
                    sentence_request.text = text;
                    match backend.synthesize(&sentence_request).await {
                        Ok(audio) => audio.bytes,
                        Err(e) => {
                            warn!(index, error = %e, "Sentence synthesis failed, skipping");
                            Vec::new()
                        }
                    }
                }
            },
            move |index, bytes| async move {
                match player
                    .play(&bytes, AudioFormat::Uncompressed, volume)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(index, error = %e, "Sentence playback failed");
                        false
                    }
                }
            },
        )
        .await;

        if played == 0 {
            return Err(VoiceError::Synthesis(
                "no sentence of the message could be played".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SpeechSink for SpeechDispatcher {
    async fn speak(&self, request: &SpeechRequest) -> Result<(), VoiceError> {
        Self::speak(self, request).await
    }

    fn playback_application(&self) -> Option<&'static str> {
        Self::playback_application(self)
    }
}
