//! # Endpoint Discovery
//!
//! Finds the `authorization_endpoint` and `token_endpoint` a profile URL
//! advertises.
//!
//! ## Algorithm
//!
//! 1. Fetch the profile URL, following every redirect manually up to
//!    [`DiscoveryConfig::max_redirects`](crate::DiscoveryConfig). The
//!    canonical profile URL advances only through the leading run of
//!    permanent (301/308) redirects; see [`resolve_permanent_redirects`].
//! 2. Look for the endpoints in the final response's `Link` headers. If both
//!    are there, the body is never read.
//! 3. Otherwise scan a bounded prefix of the body for `<link>` tags and fill
//!    in whatever the headers did not provide. Header values always win.
//!
//! Relative endpoint URLs are resolved against the URL of the final response.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use indieauth::{DiscoveryConfig, EndpointDiscoverer, ReqwestTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiscoveryConfig::default();
//! let transport = Arc::new(ReqwestTransport::new(&config)?);
//! let discoverer = EndpointDiscoverer::new(transport, config);
//!
//! let result = discoverer.discover("https://aaronparecki.com/").await?;
//! if let Some(endpoint) = &result.authorization_endpoint {
//!     println!("{} authenticates via {endpoint}", result.canonical_me);
//! }
//! # Ok(())
//! # }
//! ```

mod fetcher;
mod types;

pub use fetcher::EndpointDiscoverer;
pub use types::{DiscoveryError, DiscoveryResult, RedirectHop, resolve_permanent_redirects};

/// Relation name of the authorization endpoint
pub const AUTHORIZATION_ENDPOINT: &str = "authorization_endpoint";

/// Relation name of the token endpoint
pub const TOKEN_ENDPOINT: &str = "token_endpoint";
