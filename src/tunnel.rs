//! Upgrade tunnel for the `/live` prefix.
//!
//! WebSocket upgrades are answered by opening a second handshake to the
//! upstream at the prefix-stripped path and relaying frames in both
//! directions until either side closes. Plain requests under the prefix
//! fall through to the HTTP forwarder. Logging on this path stays at debug
//! level.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderValue};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as UpstreamRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::{self, Message as UpstreamMessage};
use tracing::debug;

use crate::forward;
use crate::AppState;

/// Handler for `/live` and `/live/*path`.
pub async fn tunnel(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    req: Request,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        // Non-upgrade traffic under the tunnel prefix forwards like any
        // other proxied request.
        Err(_) => return forward::proxy_request(state, req, "/live").await,
    };

    let path_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let stripped = forward::strip_route_prefix(path_query, "/live");
    let upstream_url = ws_url(&state.config.target_url, &stripped);

    let protocols: Vec<String> = req
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let ws = if protocols.is_empty() {
        ws
    } else {
        ws.protocols(protocols.clone())
    };

    debug!(url = %upstream_url, "proxying websocket upgrade");
    ws.on_upgrade(move |socket| relay_socket(socket, upstream_url, protocols))
}

/// Pair the client socket with an upstream socket and copy frames in both
/// directions. Closure or error on either side terminates both.
async fn relay_socket(mut client: WebSocket, upstream_url: String, protocols: Vec<String>) {
    let request = match upstream_request(&upstream_url, &protocols) {
        Ok(request) => request,
        Err(err) => {
            debug!("invalid upstream websocket url {upstream_url}: {err}");
            let _ = client.send(Message::Close(None)).await;
            return;
        }
    };

    let (upstream, _) = match connect_async(request).await {
        Ok(pair) => pair,
        Err(err) => {
            debug!("upstream websocket handshake failed: {err}");
            let _ = client.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let (mut client_tx, mut client_rx) = client.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let closing = matches!(msg, Message::Close(_));
            if upstream_tx.send(client_frame_to_upstream(msg)).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let closing = matches!(msg, UpstreamMessage::Close(_));
            let Some(frame) = upstream_frame_to_client(msg) else {
                continue;
            };
            if client_tx.send(frame).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
    };

    // Whichever direction finishes first tears down both sockets.
    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}

fn upstream_request(
    url: &str,
    protocols: &[String],
) -> Result<UpstreamRequest, tungstenite::Error> {
    let mut request = url.into_client_request()?;
    if !protocols.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&protocols.join(", ")) {
            request
                .headers_mut()
                .insert(header::SEC_WEBSOCKET_PROTOCOL, value);
        }
    }
    Ok(request)
}

/// Rewrite the configured HTTP base URL to its WebSocket counterpart and
/// append the prefix-stripped path. Bases already carrying a ws scheme are
/// left alone.
fn ws_url(base: &str, path_query: &str) -> String {
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}{path_query}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}{path_query}")
    } else {
        format!("{base}{path_query}")
    }
}

fn client_frame_to_upstream(msg: Message) -> UpstreamMessage {
    match msg {
        Message::Text(text) => UpstreamMessage::Text(text),
        Message::Binary(data) => UpstreamMessage::Binary(data),
        Message::Ping(data) => UpstreamMessage::Ping(data),
        Message::Pong(data) => UpstreamMessage::Pong(data),
        Message::Close(frame) => UpstreamMessage::Close(frame.map(|frame| UpstreamCloseFrame {
            code: frame.code.into(),
            reason: frame.reason,
        })),
    }
}

fn upstream_frame_to_client(msg: UpstreamMessage) -> Option<Message> {
    match msg {
        UpstreamMessage::Text(text) => Some(Message::Text(text)),
        UpstreamMessage::Binary(data) => Some(Message::Binary(data)),
        UpstreamMessage::Ping(data) => Some(Message::Ping(data)),
        UpstreamMessage::Pong(data) => Some(Message::Pong(data)),
        UpstreamMessage::Close(frame) => Some(Message::Close(frame.map(|frame| CloseFrame {
            code: frame.code.into(),
            reason: frame.reason,
        }))),
        // Raw frames never surface from a read without the capability
        // enabled; nothing to relay.
        UpstreamMessage::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_base_becomes_wss() {
        assert_eq!(
            ws_url("https://example.test", "/foo"),
            "wss://example.test/foo"
        );
    }

    #[test]
    fn test_http_base_becomes_ws() {
        assert_eq!(
            ws_url("http://127.0.0.1:9000", "/?q=1"),
            "ws://127.0.0.1:9000/?q=1"
        );
    }

    #[test]
    fn test_ws_base_kept() {
        assert_eq!(ws_url("ws://example.test", "/"), "ws://example.test/");
    }

    #[test]
    fn test_close_frame_codes_carried_upstream() {
        let msg = client_frame_to_upstream(Message::Close(Some(CloseFrame {
            code: 1001,
            reason: "bye".into(),
        })));
        match msg {
            UpstreamMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1001);
                assert_eq!(frame.reason, "bye");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_text_frames_map_both_ways() {
        assert_eq!(
            client_frame_to_upstream(Message::Text("hi".to_string())),
            UpstreamMessage::Text("hi".to_string())
        );
        match upstream_frame_to_client(UpstreamMessage::Text("hi".to_string())) {
            Some(Message::Text(text)) => assert_eq!(text, "hi"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
