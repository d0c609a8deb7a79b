//! Caller identity, resolved per request from the backend profile endpoint.
//!
//! ARCHITECTURE
//! ============
//! The edge holds no sessions of its own. Each page request asks the backend
//! "who am I" with the caller's cookies and keeps the answer in request
//! extensions for the rest of that request only.
//!
//! TRADE-OFFS
//! ==========
//! Every failure (non-2xx, network error, timeout, bad body) degrades to an
//! anonymous identity instead of an error page. A flaky profile endpoint
//! costs signed-in users their protected pages for one request, never the
//! public site. There is no retry; the next request asks again.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};

use super::policy::ADMIN_ROLE;

/// Backend path answering "who am I" for the cookies it is given.
pub const PROFILE_PATH: &str = "/user/profile";

// =============================================================================
// TYPES
// =============================================================================

/// Profile as returned by the backend, kept as the raw JSON object. Only
/// `role` is interpreted, and only when it is a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub serde_json::Map<String, serde_json::Value>);

impl Profile {
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.0.get("role").and_then(serde_json::Value::as_str)
    }
}

/// Request-scoped login state. Serializes as `{ "loggedIn": .., "user": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub logged_in: bool,
    pub user: Option<Profile>,
}

impl Identity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { logged_in: false, user: None }
    }

    #[must_use]
    pub fn authenticated(profile: Profile) -> Self {
        Self { logged_in: true, user: Some(profile) }
    }

    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().and_then(Profile::role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(ADMIN_ROLE)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("profile request timed out")]
    Timeout,
    #[error("profile request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("profile endpoint returned {0}")]
    Status(StatusCode),
    #[error("malformed profile body: {0}")]
    MalformedProfile(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Transport(err) }
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Ask the backend for the profile behind the caller's cookies.
///
/// Every `Cookie` header is forwarded unchanged; nothing else from the
/// inbound request is sent. The timeout covers the whole exchange, body
/// included.
pub async fn fetch_profile(
    client: &reqwest::Client,
    backend_url: &str,
    cookies: &HeaderMap,
    timeout: Duration,
) -> Result<Profile, IdentityError> {
    let mut request = client
        .get(format!("{backend_url}{PROFILE_PATH}"))
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .timeout(timeout);
    for cookie in cookies.get_all(header::COOKIE) {
        request = request.header(header::COOKIE, cookie.clone());
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(IdentityError::Status(status));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| IdentityError::MalformedProfile(e.to_string()))
}

/// Resolve the caller's identity, absorbing every failure into `anonymous`.
pub async fn resolve(
    client: &reqwest::Client,
    backend_url: &str,
    headers: &HeaderMap,
    timeout: Duration,
) -> Identity {
    match fetch_profile(client, backend_url, headers, timeout).await {
        Ok(profile) => Identity::authenticated(profile),
        Err(IdentityError::Status(status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN))) => {
            tracing::debug!(%status, "no session behind cookies, treating caller as anonymous");
            Identity::anonymous()
        }
        Err(e) => {
            tracing::warn!(error = %e, "identity check failed, treating caller as anonymous");
            Identity::anonymous()
        }
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
