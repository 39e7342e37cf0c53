//! Profile URL and client identifier validation
//!
//! Pure, total predicates implementing the IndieAuth URL grammar. A URL that
//! cannot be parsed is simply invalid; nothing here returns an error.
//!
//! Some rules are checked on the raw string rather than on [`url::Url`]
//! because the parser normalises away exactly the things that must be
//! rejected (`..` segments, default ports, an empty path).

use std::net::Ipv4Addr;

use url::{Host, Url};

use crate::canonical::RawUrl;

/// Checks shared by profile URLs and client identifiers.
///
/// Returns the parsed URL and the raw authority (with any userinfo already
/// rejected) so callers can apply their own host/port rules.
fn common_checks(url: &str) -> Option<(Url, &str)> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let raw = RawUrl::split(url)?;
    // MUST contain a path component ("/" is a valid path)
    if raw.path.is_empty() {
        return None;
    }
    // MUST NOT contain single-dot or double-dot path segments
    if raw.path.split('/').any(|segment| segment == "." || segment == "..") {
        return None;
    }
    // MUST NOT contain a fragment component
    if raw.rest.contains('#') || parsed.fragment().is_some() {
        return None;
    }
    // MUST NOT contain a username or password component
    if raw.authority.contains('@') {
        return None;
    }

    Some((parsed, raw.authority))
}

/// Validate a user profile URL ("me").
///
/// A profile URL has an `http`/`https` scheme, a non-empty path without `.`
/// or `..` segments, and no fragment, userinfo or port. The host must be a
/// domain name, never an IP address.
///
/// ```
/// use indieauth::verify_profile_url;
///
/// assert!(verify_profile_url("https://example.com/username"));
/// assert!(!verify_profile_url("https://example.com:8443/"));
/// assert!(!verify_profile_url("https://172.28.92.51/"));
/// ```
pub fn verify_profile_url(url: &str) -> bool {
    let Some((parsed, authority)) = common_checks(url) else {
        return false;
    };
    // MUST NOT contain a port (checked raw: the parser drops default ports)
    if authority.contains(':') {
        return false;
    }
    matches!(parsed.host(), Some(Host::Domain(_)))
}

/// Validate a client identifier URL.
///
/// Same rules as [`verify_profile_url`] except that a port is allowed and
/// the IPv4 loopback address `127.0.0.1` is accepted as a host. The IPv6
/// loopback `[::1]` is not accepted yet.
pub fn verify_client_identifier(url: &str) -> bool {
    let Some((parsed, _)) = common_checks(url) else {
        return false;
    };
    match parsed.host() {
        Some(Host::Domain(_)) => true,
        Some(Host::Ipv4(addr)) => addr == Ipv4Addr::LOCALHOST,
        // TODO: accept the IPv6 loopback [::1] once hosts can be configured for it
        Some(Host::Ipv6(_)) | None => false,
    }
}
