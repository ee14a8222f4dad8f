//! Session (storage-state) loading
//!
//! A session file is the storage-state JSON written by a logged-in browser:
//! a `cookies` array plus other keys that are ignored here.

use serde::Deserialize;
use std::path::Path;
use url::Url;

/// One cookie from a storage-state file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    /// True when this cookie would be sent to `url`
    pub fn matches(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host,
            None => return false,
        };

        let domain = self.domain.trim_start_matches('.');
        let domain_ok = domain.is_empty()
            || host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()));

        domain_ok && url.path().starts_with(&self.path)
    }
}

/// Authenticated browsing state applied to every new page
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
}

impl SessionState {
    /// Loads a storage-state file
    ///
    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// (unauthenticated) session and a warning.
    pub fn load(path: &Path) -> SessionState {
        if !path.exists() {
            tracing::warn!(
                "Session file {} not found, continuing unauthenticated",
                path.display()
            );
            return SessionState::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", path.display(), e);
                return SessionState::default();
            }
        };

        match serde_json::from_str::<SessionState>(&content) {
            Ok(session) => {
                tracing::info!(
                    "Loaded session with {} cookies from {}",
                    session.cookies.len(),
                    path.display()
                );
                session
            }
            Err(e) => {
                tracing::warn!("Malformed session file {}: {}", path.display(), e);
                SessionState::default()
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Builds a `Cookie` header value for a request to `url`
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}
