//! Route classification and the access policy applied by the auth gate.
//!
//! DESIGN
//! ======
//! The policy is a pure function of `(role, logged_in, path)`, so every
//! branch can be table-tested without a backend. The gate owns the network
//! call and only feeds the resolved identity in here.
//!
//! Route entries are either exact paths (`/post-job`) or prefix patterns
//! ending in `/*` (`/admin/*`), which match the prefix itself and anything
//! below it. One trailing slash on the request path is ignored.
//!
//! Decisions are made on the canonical page path, i.e. the page the file
//! server will actually resolve: percent-decoded, empty and `.` segments
//! dropped, `..` applied, and a trailing `index.html` removed. Matching the
//! raw path would let `/%64ashboard/` or `/dashboard/index.html` reach a
//! guarded page.

use super::identity::Identity;

/// Path prefix owned by the proxy. Matched per segment: `/api` and `/api/...`
/// are API paths, `/apiary` is not.
pub const API_PREFIX: &str = "/api";

pub const ADMIN_ROLE: &str = "admin";
pub const ADMIN_LANDING_PATH: &str = "/admin/user-approval";
pub const LOGIN_PROMPT_PATH: &str = "/login";

/// Pages that require a signed-in employer.
pub const PROTECTED_ROUTES: &[&str] = &[
    "/dashboard",
    "/post-job",
    "/edit-job/*",
    "/applications",
    "/messages",
    "/notifications",
    "/calendar",
    "/employees",
    "/profile",
    "/settings",
];

/// Pages only an admin may see. Everyone else gets a 404 here.
pub const ADMIN_ROUTES: &[&str] = &["/admin/user-approval", "/admin/*"];

// =============================================================================
// ROUTE SET
// =============================================================================

/// A static set of page paths, split into exact matches and `/*` prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl RouteSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_suffix("/*") {
                Some(prefix) => set.prefixes.push(prefix.to_owned()),
                None => set.exact.push(trim_trailing_slash(pattern).to_owned()),
            }
        }
        set
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let path = trim_trailing_slash(path);
        self.exact.iter().any(|route| route == path) || self.prefixes.iter().any(|prefix| is_under(path, prefix))
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 { path.strip_suffix('/').unwrap_or(path) } else { path }
}

/// The page a request path resolves to, in the form route entries use.
#[must_use]
pub fn canonical_page_path(raw: &str) -> String {
    let decoded = match urlencoding::decode(raw) {
        Ok(path) => path.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.last() == Some(&"index.html") {
        segments.pop();
    }

    format!("/{}", segments.join("/"))
}

/// `true` when `path` equals `prefix` or continues it with a `/` segment.
pub(crate) fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

// =============================================================================
// POLICY
// =============================================================================

/// Outcome of the gate for a single page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Admin area requested by a non-admin. Answered as if the page did not exist.
    NotFound,
    /// Send the caller elsewhere (admin landing or login prompt).
    Redirect(&'a str),
    /// Hand the request to the rendering stage.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub protected: RouteSet,
    pub admin: RouteSet,
    pub admin_landing: String,
    pub login_prompt: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            protected: RouteSet::new(PROTECTED_ROUTES),
            admin: RouteSet::new(ADMIN_ROUTES),
            admin_landing: ADMIN_LANDING_PATH.to_owned(),
            login_prompt: LOGIN_PROMPT_PATH.to_owned(),
        }
    }
}

impl RoutePolicy {
    /// Paths the proxy answers. The gate skips its identity check for these.
    #[must_use]
    pub fn is_api(path: &str) -> bool {
        is_under(path, API_PREFIX)
    }

    /// Evaluate the access rules in order; the first match wins.
    ///
    /// Admins are confined to the admin area: any other path, public ones
    /// included, redirects them to the admin landing page.
    #[must_use]
    pub fn decide<'a>(&'a self, identity: &Identity, path: &str) -> Decision<'a> {
        let admin_path = self.admin.contains(path);
        let is_admin = identity.is_admin();

        if !is_admin && admin_path {
            Decision::NotFound
        } else if is_admin && !admin_path {
            Decision::Redirect(&self.admin_landing)
        } else if !identity.logged_in && self.protected.contains(path) {
            Decision::Redirect(&self.login_prompt)
        } else {
            Decision::Continue
        }
    }
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
