//! Process configuration resolved once from the environment.

use std::net::SocketAddr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TARGET_URL: &str = "https://play.geforcenow.com";

/// Immutable configuration, built at startup and passed into the router
/// state. The target URL is not validated here; a malformed value surfaces
/// when the first forwarded request fails to connect.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the listener binds to (`PORT`).
    pub listen_port: u16,
    /// Upstream base URL all requests are forwarded to (`TARGET_URL`),
    /// stored without a trailing slash.
    pub target_url: String,
}

impl Config {
    /// Read `PORT` and `TARGET_URL`, silently falling back to defaults.
    pub fn from_env() -> Self {
        Self::resolve(std::env::var("PORT").ok(), std::env::var("TARGET_URL").ok())
    }

    fn resolve(port: Option<String>, target: Option<String>) -> Self {
        let listen_port = port
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let target_url = target
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());
        Self {
            listen_port,
            target_url,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.listen_port))
    }
}
