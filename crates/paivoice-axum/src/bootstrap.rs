//! Server bootstrap - the composition root.
//!
//! The only place where configuration loading, probes, engine selection,
//! the queue worker and the HTTP layer are wired together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use paivoice_core::{DaemonConfig, VoiceCatalog, load_pronunciations};
use paivoice_engine::{AudioQueue, ProbeReport, SpeechDispatcher, SpeechSink};

use crate::rate_limit::RateLimiter;
use crate::state::{AppState, DaemonContext};

/// Start-up options from the command line.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Overrides the env-file `PORT`.
    pub port: Option<u16>,
    /// Explicit env file instead of `~/.env`.
    pub env_file: Option<PathBuf>,
    /// Explicit data directory instead of `~/.pai`.
    pub pai_dir: Option<PathBuf>,
}

/// Load configuration, run the probes, select the engine and start the
/// queue worker. Everything after this is read-only wiring.
pub async fn bootstrap(server_config: &ServerConfig) -> AppState {
    let env_file = server_config
        .env_file
        .clone()
        .or_else(|| dirs::home_dir().map(|h| h.join(".env")));
    let mut config =
        DaemonConfig::load_from(env_file.as_deref(), server_config.pai_dir.as_deref());
    if let Some(port) = server_config.port {
        config.port = port;
    }

    let report = ProbeReport::run(&config).await;
    let dispatcher = Arc::new(SpeechDispatcher::new(&config, &report));
    let selection = dispatcher.selection();
    let queue = AudioQueue::start(Arc::clone(&dispatcher) as Arc<dyn SpeechSink>);

    let voices = VoiceCatalog::load(&config.voices_path());
    let pronunciations = load_pronunciations(&config.pronunciations_path());

    Arc::new(DaemonContext {
        config,
        selection,
        voices,
        pronunciations,
        queue,
        rate_limiter: RateLimiter::new(),
    })
}

/// Bootstrap and serve until ctrl-c.
///
/// A failed bind is the daemon's only fatal exit; operational errors all
/// surface as HTTP responses or logs.
pub async fn start_server(server_config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;

    let state = bootstrap(&server_config).await;
    let port = state.config.port;
    let app = crate::routes::create_router(state);

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("PAI voice daemon listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
