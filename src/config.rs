//! Edge configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::policy::RoutePolicy;

pub const DEFAULT_PORT: u16 = 4321;
pub const DEFAULT_PAGES_DIR: &str = "./dist";
pub const DEFAULT_IDENTITY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTimeouts {
    /// Whole identity exchange, body included.
    pub identity: Duration,
    /// Until the backend's response headers arrive. Bodies stream without a deadline.
    pub proxy: Duration,
    pub connect: Duration,
}

impl Default for EdgeTimeouts {
    fn default() -> Self {
        Self {
            identity: Duration::from_millis(DEFAULT_IDENTITY_TIMEOUT_MS),
            proxy: Duration::from_secs(DEFAULT_PROXY_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    /// Backend origin without a trailing slash, e.g. `https://api.worknow.example`.
    pub backend_url: String,
    pub port: u16,
    pub pages_dir: PathBuf,
    pub timeouts: EdgeTimeouts,
    pub policy: RoutePolicy,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BACKEND_URL is required")]
    MissingBackendUrl,
    #[error("invalid BACKEND_URL '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },
    #[error("invalid {key} '{value}': expected an unsigned integer")]
    InvalidNumber { key: &'static str, value: String },
    #[error("admin landing path '{0}' is not an admin route")]
    AdminLandingNotAdmin(String),
    #[error("login prompt path '{0}' is itself guarded")]
    LoginPromptGuarded(String),
}

impl EdgeConfig {
    /// Build typed config from process environment variables.
    ///
    /// Required:
    /// - `BACKEND_URL`
    ///
    /// Optional:
    /// - `PORT`: default 4321
    /// - `PAGES_DIR`: default `./dist`
    /// - `IDENTITY_TIMEOUT_MS`: default 5000
    /// - `PROXY_TIMEOUT_SECS`: default 30
    /// - `CONNECT_TIMEOUT_SECS`: default 5
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EdgeConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;
        let backend_url = parse_backend_url(&raw_url)?;

        let port = parse_number(&lookup, "PORT", DEFAULT_PORT)?;
        let pages_dir = lookup("PAGES_DIR").map_or_else(|| PathBuf::from(DEFAULT_PAGES_DIR), PathBuf::from);
        let timeouts = EdgeTimeouts {
            identity: Duration::from_millis(parse_number(&lookup, "IDENTITY_TIMEOUT_MS", DEFAULT_IDENTITY_TIMEOUT_MS)?),
            proxy: Duration::from_secs(parse_number(&lookup, "PROXY_TIMEOUT_SECS", DEFAULT_PROXY_TIMEOUT_SECS)?),
            connect: Duration::from_secs(parse_number(&lookup, "CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?),
        };

        let policy = RoutePolicy::default();
        validate_policy(&policy)?;

        Ok(Self { backend_url, port, pages_dir, timeouts, policy })
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn parse_backend_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidBackendUrl { url: raw.to_owned(), reason };

    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".into()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".into()));
    }
    Ok(trimmed.to_owned())
}

/// Reject route tables whose redirects would bounce forever.
pub(crate) fn validate_policy(policy: &RoutePolicy) -> Result<(), ConfigError> {
    if !policy.admin.contains(&policy.admin_landing) {
        return Err(ConfigError::AdminLandingNotAdmin(policy.admin_landing.clone()));
    }
    if policy.protected.contains(&policy.login_prompt) || policy.admin.contains(&policy.login_prompt) {
        return Err(ConfigError::LoginPromptGuarded(policy.login_prompt.clone()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
