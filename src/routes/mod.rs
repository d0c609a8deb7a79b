//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the whole edge pipeline:
//!
//! - `/api`, `/api/`, `/api/{*path}` → proxy, terminal.
//! - everything else → auth gate → rendered pages from `PAGES_DIR`.
//! - `/healthz` sits outside the gate so probes never hit the backend.

pub mod gate;
pub mod proxy;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{any, get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full edge router: API passthrough, gated pages, health probe.
pub fn app(state: AppState) -> Router {
    let pages = ServeDir::new(&state.config.pages_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api", any(proxy::forward))
        .route("/api/", any(proxy::forward))
        .route("/api/{*path}", any(proxy::forward))
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(state.clone(), gate::auth_gate))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
