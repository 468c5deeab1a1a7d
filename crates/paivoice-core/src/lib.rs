//! Core domain types, configuration and text processing for the PAI voice
//! daemon.
//!
//! This crate is infrastructure-free: no HTTP, no subprocesses, no audio.
//! Engines, prosody, configuration snapshots and the text pipeline live
//! here so the engine and HTTP adapters can share them.

pub mod config;
pub mod domain;
pub mod error;
pub mod text;
pub mod voices;

// Re-export key types for convenience
pub use config::{DEFAULT_PORT, DEFAULT_QWEN3_PORT, DEFAULT_VOICE_ID, DaemonConfig};
pub use domain::{AudioFormat, Engine, Prosody, ProsodyOverride, resolve_volume};
pub use error::VoiceError;
pub use text::{MAX_FIELD_LEN, Pronunciations, prepare_speech_text, sanitize, split_sentences};
pub use voices::{VoiceCatalog, VoicePersona, load_pronunciations};
