//! Reverse proxy for a fixed upstream origin (GeForce NOW by default).
//!
//! Serves a status page and a health endpoint, forwards `/api` requests to
//! the configured upstream, tunnels WebSocket upgrades under `/live` with
//! the prefix stripped, and answers everything else with a 404 page.

pub mod config;
pub mod error;
pub mod forward;
pub mod pages;
pub mod tunnel;

use std::time::Duration;

use axum::routing::{any, get};
use axum::Router;
use tower_http::cors::CorsLayer;

use config::Config;

/// Shared read-only state: the resolved configuration and the outbound
/// HTTP client, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http }
    }
}

/// Build the application router: status page, health, the `/live` tunnel
/// prefix, the `/api` forward prefix, and the 404 fallback. The bare
/// prefix routes make an empty remainder reach the upstream root.
pub fn app(config: Config) -> Router {
    let state = AppState::new(config);
    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(pages::health))
        .route("/live", any(tunnel::tunnel))
        .route("/live/*path", any(tunnel::tunnel))
        .route("/api", any(forward::forward))
        .route("/api/*path", any(forward::forward))
        .fallback(pages::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
