//! Request forwarder: strips a route prefix from the inbound request,
//! reissues it against the upstream, and relays status, headers, and body
//! back verbatim. Upstream bodies are treated as opaque bytes; nothing here
//! assumes JSON.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::AppState;

/// Cap on buffered inbound request bodies.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Inbound headers not replayed to the upstream. `Host` comes from the
/// target URL; the client recomputes framing headers.
const SKIPPED_REQUEST_HEADERS: &[HeaderName] = &[
    header::HOST,
    header::CONNECTION,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// Upstream headers not relayed to the client; the body is re-framed.
const SKIPPED_RESPONSE_HEADERS: &[HeaderName] = &[
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::CONTENT_LENGTH,
];

/// Handler for `/api` and `/api/*path`.
pub async fn forward(State(state): State<AppState>, req: Request) -> Response {
    proxy_request(state, req, "/api").await
}

/// Strip `prefix` from the request and relay it to the upstream. Shared by
/// the `/api` forwarder and the plain-HTTP half of the tunnel prefix.
pub(crate) async fn proxy_request(state: AppState, req: Request, prefix: &str) -> Response {
    let path_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let stripped = strip_route_prefix(path_query, prefix);

    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => return ProxyError::Body(err).into_response(),
    };

    match relay_request(&state, parts.method, &stripped, parts.headers, body).await {
        Ok(response) => response,
        Err(err) => {
            warn!("upstream request failed: {err}");
            err.into_response()
        }
    }
}

/// Issue one outbound request and convert the upstream response. Exactly
/// one attempt; any failure maps to the fixed 500 payload.
async fn relay_request(
    state: &AppState,
    method: Method,
    path_query: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let url = format!("{}{}", state.config.target_url, path_query);
    debug!(%method, %url, "forwarding request");

    let mut outbound = HeaderMap::new();
    for (name, value) in headers.iter() {
        if SKIPPED_REQUEST_HEADERS.contains(name) {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    let mut request = state.http.request(method, &url).headers(outbound);
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await?;

    let mut response = Response::builder().status(upstream.status());
    if let Some(headers_mut) = response.headers_mut() {
        for (name, value) in upstream.headers() {
            if SKIPPED_RESPONSE_HEADERS.contains(name) {
                continue;
            }
            headers_mut.append(name.clone(), value.clone());
        }
    }

    let body = upstream.bytes().await?;
    Ok(response
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// Remove a leading route prefix, keeping the query string. An empty
/// remainder maps to the upstream root rather than an invalid request.
pub(crate) fn strip_route_prefix(path_query: &str, prefix: &str) -> String {
    let rest = path_query.strip_prefix(prefix).unwrap_or(path_query);
    match rest.as_bytes().first() {
        None => "/".to_string(),
        Some(b'/') => rest.to_string(),
        Some(_) => format!("/{rest}"),
    }
}
