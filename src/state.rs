//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and middleware via the `State`
//! extractor. It holds the immutable configuration and one backend HTTP
//! client. Nothing in it changes after startup, so concurrent requests share
//! it without locks.

use std::sync::Arc;

use crate::config::EdgeConfig;

/// Shared application state. Clone is required by Axum; fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EdgeConfig>,
    /// Client for both the identity check and proxied calls. Never follows
    /// redirects: a backend 3xx is the caller's to see.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state and the backend client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: EdgeConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config: Arc::new(config), http })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
