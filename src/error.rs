//! Error type for the forwarding path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure on the forwarding boundary. Every variant renders as the same
/// fixed 500 payload; the process never crashes on a bad upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Outbound call failed: connection refused, DNS, timeout, or an error
    /// while reading the upstream body.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    /// Inbound request body could not be buffered.
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": "Proxy failed",
            "message": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_renders_fixed_500_payload() {
        let err = ProxyError::Body(axum::Error::new(std::io::Error::other("boom")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Proxy failed");
        assert!(!value["message"].as_str().unwrap().is_empty());
    }
}
