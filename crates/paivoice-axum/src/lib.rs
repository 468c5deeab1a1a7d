//! Axum HTTP adapter for the PAI voice daemon.
//!
//! Three endpoints on loopback: `POST /notify`, its `POST /pai` alias and
//! `GET /health`. Validation, sanitisation and rate limiting happen here;
//! everything audible is delegated to `paivoice-engine` through the
//! serial queue.

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod validate;

// Re-export primary types
pub use bootstrap::{ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::{AppState, DaemonContext};
