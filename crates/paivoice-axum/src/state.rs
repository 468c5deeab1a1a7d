//! Shared application state type.

use std::sync::Arc;

use paivoice_core::{DaemonConfig, Engine, Pronunciations, VoiceCatalog};
use paivoice_engine::AudioQueue;

use crate::rate_limit::RateLimiter;

/// Everything the handlers need, built once at bootstrap.
///
/// All fields except the queue and the rate limiter are read-only for the
/// daemon's lifetime; those two serialise their own access internally.
pub struct DaemonContext {
    /// Immutable configuration snapshot.
    pub config: DaemonConfig,
    /// Engine cached at start-up, reported by `/health`.
    pub selection: Engine,
    /// Voice personalities from the voices file.
    pub voices: VoiceCatalog,
    /// Compiled pronunciation replacements.
    pub pronunciations: Pronunciations,
    /// Serial audio queue handle.
    pub queue: AudioQueue,
    /// Per-client request buckets.
    pub rate_limiter: RateLimiter,
}

/// Application state shared across all handlers.
pub type AppState = Arc<DaemonContext>;
