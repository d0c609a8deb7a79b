//! API passthrough: every request under `/api` is relayed to the backend.
//!
//! DESIGN
//! ======
//! The proxy owns no API semantics. Method, headers and body go out as
//! received; status, headers and body come back as the backend sent them,
//! error responses included. The one response it writes itself is the fixed
//! 500 for a backend it could not reach.
//!
//! Bodies stream in both directions. Upload bodies (JSON, multipart) are never
//! buffered; a 2xx response body is piped straight through. Non-2xx bodies are
//! read whole before relaying so a half-read error never reaches the caller.
//! The proxy timeout bounds the wait for response headers and, separately,
//! that buffered error-body read.
//!
//! Connection-scoped headers (`Connection` and the hop-by-hop set) are
//! dropped both ways since the HTTP stack re-frames each leg itself.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use hyper::ext::ReasonPhrase;

use crate::services::policy::API_PREFIX;
use crate::state::AppState;

/// Plain-text body of the synthesized 500. Carries no backend detail.
pub const PROXY_FAILURE_BODY: &str = "Internal Server Error";

/// Lowercase names that describe one connection leg, not the message.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to build relayed response: {0}")]
    Response(#[from] axum::http::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            PROXY_FAILURE_BODY,
        )
            .into_response()
    }
}

// =============================================================================
// HANDLER
// =============================================================================

/// `ANY /api/{*path}` — relay to `{BACKEND_URL}/{path}?{query}`.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    match relay(&state, request).await {
        Ok(response) => {
            tracing::debug!(%method, %path, status = %response.status(), "relayed backend response");
            response
        }
        Err(e) => {
            tracing::error!(%method, %path, error = %e, "backend unreachable, answering 500");
            e.into_response()
        }
    }
}

async fn relay(state: &AppState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let target = target_url(&state.config.backend_url, &parts.uri);
    let mut headers = forwardable_headers(&parts.headers);

    let mut outbound = state.http.request(parts.method.clone(), target);
    if carries_body(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    } else {
        headers.remove(header::CONTENT_LENGTH);
    }
    let pending = outbound.headers(headers).send();

    let timeout = state.config.timeouts.proxy;
    let backend = tokio::time::timeout(timeout, pending)
        .await
        .map_err(|_| ProxyError::Timeout(timeout))??;

    let status = backend.status();
    let mut response = Response::builder().status(status);
    if let Some(headers) = response.headers_mut() {
        *headers = forwardable_headers(backend.headers());
    }
    // Only present when the backend's reason phrase is non-canonical.
    if let Some(reason) = backend.extensions().get::<ReasonPhrase>() {
        response = response.extension(reason.clone());
    }

    let body = if status.is_success() {
        Body::from_stream(backend.bytes_stream())
    } else {
        let bytes = tokio::time::timeout(timeout, backend.bytes())
            .await
            .map_err(|_| ProxyError::Timeout(timeout))??;
        Body::from(bytes)
    };
    Ok(response.body(body)?)
}

fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Join the backend base with everything after the API prefix, then the raw
/// query string. Path and query are copied as received, never decoded.
pub(crate) fn target_url(backend_url: &str, uri: &Uri) -> String {
    let path = uri.path();
    let sub_path = path.strip_prefix(API_PREFIX).unwrap_or(path);

    let mut target = String::with_capacity(backend_url.len() + path.len() + 1 + uri.query().map_or(0, str::len));
    target.push_str(backend_url);
    target.push_str(sub_path);
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Copy `headers` minus the hop-by-hop set and anything `Connection` names.
/// Repeated headers (`Set-Cookie`, `Cookie`) keep every value in order.
pub(crate) fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let named_by_connection: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let hop = HOP_BY_HOP.contains(&name.as_str()) || named_by_connection.iter().any(|token| token == name.as_str());
        if !hop {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
