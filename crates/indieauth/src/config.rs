//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::AllowList;

/// Configuration consumed by [`crate::IndieAuthClient`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndieAuthConfig {
    /// Identities permitted to view the instance; `None` leaves the decision
    /// to the host
    pub restrict_access: Option<AllowList>,

    /// Network behaviour of discovery and the code exchange
    pub discovery: DiscoveryConfig,
}

/// Configuration for endpoint discovery and the code exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Per-request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,

    /// Maximum redirects followed while fetching a profile page (default: 10)
    pub max_redirects: usize,

    /// How much of a profile page body is scanned for `<link>` tags (default: 64 KiB)
    pub max_body_prefix: usize,

    /// User agent sent on every outbound request
    pub user_agent: String,
}

impl DiscoveryConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_redirects: 10,
            max_body_prefix: 64 * 1024, // 64 KiB
            user_agent: format!("indieauth-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
