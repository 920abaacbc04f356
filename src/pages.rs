//! Status page, health endpoint, and the 404 fallback.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Html;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Payload for `GET /health`. Always reports OK; the health check does not
/// depend on upstream reachability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub version: String,
    pub target: String,
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    Html(render_index(
        &now,
        &format!("{scheme}://{host}"),
        &state.config.target_url,
    ))
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "OK".to_string(),
        message: "GeForce NOW proxy server is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: state.config.target_url.clone(),
    })
}

pub async fn not_found(uri: Uri) -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(render_not_found(uri.path())))
}

fn render_index(now: &str, own_origin: &str, target: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>GeForce NOW Proxy</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{ font-family: Arial; margin: 40px; background: #0f0f23; color: #00ff00; }}
    .container {{ max-width: 800px; margin: 0 auto; background: #1a1a2e; padding: 30px; border-radius: 15px; }}
    .status {{ background: #162447; padding: 20px; border-radius: 10px; margin: 20px 0; }}
    .online {{ color: #00ff88; }}
    .btn {{ background: #00d4aa; color: white; padding: 12px 24px; border: none; border-radius: 8px; font-size: 16px; cursor: pointer; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>GeForce NOW Proxy</h1>
    <div class="status">
      <p><strong>Status:</strong> <span class="online">ONLINE</span></p>
      <p><strong>Time:</strong> {now}</p>
      <p><strong>Address:</strong> {origin}</p>
    </div>
    <p>This server forwards requests to: <code>{target}</code></p>
    <p><a href="/health"><button class="btn">Check health</button></a></p>
  </div>
</body>
</html>
"#,
        now = now,
        origin = html_escape(own_origin),
        target = html_escape(target),
    )
}

fn render_not_found(path: &str) -> String {
    format!(
        r#"<div style="padding: 40px; text-align: center;">
  <h1>404 - Page Not Found</h1>
  <p>The requested path <code>{path}</code> does not exist.</p>
  <p><a href="/">Back to the start page</a></p>
</div>
"#,
        path = html_escape(path),
    )
}

/// Escape a value echoed into server-rendered HTML.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
