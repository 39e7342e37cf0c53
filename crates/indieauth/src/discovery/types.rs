//! Discovery result and error types

use http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::http::TransportError;

/// Endpoint discovery errors
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// The profile page could not be fetched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// More redirects than the configured limit
    #[error("Too many redirects (limit {limit})")]
    TooManyRedirects {
        /// The configured maximum
        limit: usize,
    },

    /// The identifier or a redirect target is not a usable URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Outcome of endpoint discovery.
///
/// Finding no `authorization_endpoint` is a valid result, not an error; the
/// caller decides how to present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// The profile URL after following permanent redirects only
    pub canonical_me: Url,
    /// Advertised `authorization_endpoint`, resolved to an absolute URL
    pub authorization_endpoint: Option<Url>,
    /// Advertised `token_endpoint`, resolved to an absolute URL
    pub token_endpoint: Option<Url>,
}

/// One redirect observed while fetching a profile page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    /// URL that answered with the redirect
    pub url: Url,
    /// Redirect status
    pub status: StatusCode,
    /// Raw `Location` header value, possibly relative
    pub location: String,
}

impl RedirectHop {
    /// Whether the hop is a permanent redirect (301 or 308)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY | StatusCode::PERMANENT_REDIRECT
        )
    }

    /// The redirect target resolved against the URL that issued it
    pub fn target(&self) -> Option<Url> {
        self.url.join(&self.location).ok()
    }
}

/// Walk a redirect history and return the canonical URL.
///
/// The canonical URL starts as `start` and advances through each permanent
/// redirect; the first temporary redirect ends the walk, so later permanent
/// hops are ignored.
///
/// ```
/// use http::StatusCode;
/// use indieauth::discovery::{RedirectHop, resolve_permanent_redirects};
/// use url::Url;
///
/// let start = Url::parse("https://example.com/").unwrap();
/// let history = [RedirectHop {
///     url: start.clone(),
///     status: StatusCode::MOVED_PERMANENTLY,
///     location: "https://www.example.com/".into(),
/// }];
/// assert_eq!(resolve_permanent_redirects(&start, &history).as_str(), "https://www.example.com/");
/// ```
pub fn resolve_permanent_redirects(start: &Url, history: &[RedirectHop]) -> Url {
    let mut canonical = start.clone();
    for hop in history {
        if !hop.is_permanent() {
            break;
        }
        match hop.target() {
            Some(target) => canonical = target,
            None => break,
        }
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(url: &str, status: u16, location: &str) -> RedirectHop {
        RedirectHop {
            url: Url::parse(url).unwrap(),
            status: StatusCode::from_u16(status).unwrap(),
            location: location.to_string(),
        }
    }

    fn start() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_no_history_is_start() {
        assert_eq!(resolve_permanent_redirects(&start(), &[]), start());
    }

    #[test]
    fn test_permanent_chain_is_followed() {
        let history = [
            hop("https://example.com/", 301, "https://www.example.com/"),
            hop("https://www.example.com/", 301, "https://www.example.com/final"),
        ];
        assert_eq!(
            resolve_permanent_redirects(&start(), &history).as_str(),
            "https://www.example.com/final"
        );
    }

    #[test]
    fn test_temporary_hop_stops_the_walk() {
        let history = [
            hop("https://example.com/", 301, "https://www.example.com/"),
            hop("https://www.example.com/", 302, "https://www.example.com/temp"),
            hop("https://www.example.com/temp", 301, "https://elsewhere.example.com/"),
        ];
        assert_eq!(
            resolve_permanent_redirects(&start(), &history).as_str(),
            "https://www.example.com/"
        );
    }

    #[test]
    fn test_temporary_first_hop_keeps_start() {
        let history = [hop("https://example.com/", 302, "https://www.example.com/")];
        assert_eq!(resolve_permanent_redirects(&start(), &history), start());
    }

    #[test]
    fn test_relative_location_is_joined() {
        let history = [hop("https://example.com/one", 308, "/two")];
        assert_eq!(
            resolve_permanent_redirects(&start(), &history).as_str(),
            "https://example.com/two"
        );
    }
}
