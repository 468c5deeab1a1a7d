//! Daemon entry point - the composition root.
//!
//! Parses the command line, initialises logging and hands over to the
//! Axum bootstrap. The process exits non-zero only when the listener
//! cannot bind; everything else is an HTTP error or a log line.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paivoice_axum::{ServerConfig, start_server};

/// Local voice-notification daemon for PAI producers.
#[derive(Debug, Parser)]
#[command(name = "paivoice", version, about)]
struct Cli {
    /// HTTP port on loopback (overrides the env-file PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Env file to read instead of ~/.env.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Data directory holding settings.json, voices.md and
    /// pronunciations.json (defaults to ~/.pai).
    #[arg(long, value_name = "DIR")]
    pai_dir: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. "debug",
    /// "paivoice_engine=debug").
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the flag.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    start_server(ServerConfig {
        port: cli.port,
        env_file: cli.env_file,
        pai_dir: cli.pai_dir,
    })
    .await
}
