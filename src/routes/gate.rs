//! Auth gate — identity check and route guard in front of page rendering.
//!
//! Runs as an Axum middleware on every non-API route. One backend round trip
//! per page request, then exactly one of: bare 404, redirect, or `next`.
//! The API check uses the raw path, as the router does; the page rules use
//! the canonical path, as the file server does.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::services::identity;
use crate::services::policy::{Decision, RoutePolicy, canonical_page_path};
use crate::state::AppState;

/// Middleware entry point, mounted with `axum::middleware::from_fn_with_state`.
///
/// On continue, the resolved [`identity::Identity`] is stored in request
/// extensions for downstream handlers (`Extension<Identity>`).
pub async fn auth_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if RoutePolicy::is_api(&path) {
        return next.run(request).await;
    }

    let config = &state.config;
    let identity =
        identity::resolve(&state.http, &config.backend_url, request.headers(), config.timeouts.identity).await;

    let page = canonical_page_path(&path);
    match config.policy.decide(&identity, &page) {
        Decision::NotFound => {
            tracing::debug!(%path, %page, role = ?identity.role(), "admin route hidden from non-admin");
            StatusCode::NOT_FOUND.into_response()
        }
        Decision::Redirect(location) => {
            tracing::debug!(%path, %page, %location, logged_in = identity.logged_in, "redirecting page request");
            redirect(location)
        }
        Decision::Continue => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
    }
}

/// `302 Found` to `location`.
fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
