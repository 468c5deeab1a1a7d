//! Route definitions and router construction.

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::state::AppState;

/// CORS restricted to the loopback origin; the daemon is local-only.
fn cors_layer() -> CorsLayer {
    let origin: HeaderValue = HeaderValue::from_static("http://localhost");
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Create the router with all three endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/notify",
            post(handlers::notify).options(handlers::preflight),
        )
        .route("/pai", post(handlers::pai).options(handlers::preflight))
        .route(
            "/health",
            get(handlers::health).options(handlers::preflight),
        )
        .layer(cors_layer())
        .with_state(state)
}
