//! Routing key derivation.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

/// How a request URI is turned into a rate limit key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Path and query string exactly as presented. `/meals?a=1` and
    /// `/meals?a=2` get separate windows.
    #[default]
    Raw,
    /// Path only, query string dropped.
    Path,
}

/// A key that identifies one independent rate limit window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Derive the key for a request URI under the given policy.
    pub fn from_uri(uri: &Uri, policy: KeyPolicy) -> Self {
        let key = match policy {
            KeyPolicy::Raw => uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| uri.path()),
            KeyPolicy::Path => uri.path(),
        };
        Self(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoutingKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl std::fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
