//! Identifier canonicalisation and display forms
//!
//! Users type identifiers like `Example.com`; the flow needs
//! `http://example.com/`. These are plain string transforms: the `url`
//! crate is deliberately not used here because it would also normalise the
//! path and percent-encoding, and only the host may be lower-cased.

use url::Url;

/// Raw pieces of an absolute URL string, split without normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawUrl<'a> {
    pub scheme: &'a str,
    /// Everything between `://` and the first `/`, `?` or `#`
    pub authority: &'a str,
    /// Path up to (not including) `?` or `#`; may be empty
    pub path: &'a str,
    /// Query and/or fragment including their leading delimiter
    pub rest: &'a str,
}

impl<'a> RawUrl<'a> {
    pub(crate) fn split(url: &'a str) -> Option<Self> {
        let (scheme, after) = url.split_once("://")?;
        let authority_end = after.find(['/', '?', '#']).unwrap_or(after.len());
        let (authority, tail) = after.split_at(authority_end);
        let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
        let (path, rest) = tail.split_at(path_end);
        Some(Self {
            scheme,
            authority,
            path,
            rest,
        })
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Turn a user-entered identifier into an absolute URL string.
///
/// - a missing scheme becomes `http://`
/// - scheme and host are lower-cased (path, query and fragment are not)
/// - an empty path becomes `/`
///
/// The transform is idempotent.
///
/// ```
/// use indieauth::canonicalize_url;
///
/// assert_eq!(canonicalize_url("example.com"), "http://example.com/");
/// assert_eq!(canonicalize_url("http://Example.com"), "http://example.com/");
/// assert_eq!(canonicalize_url("https://example.com/Foo"), "https://example.com/Foo");
/// ```
pub fn canonicalize_url(input: &str) -> String {
    let input = input.trim();
    let owned;
    let url = if has_http_scheme(input) {
        input
    } else {
        owned = format!("http://{input}");
        &owned
    };

    let Some(raw) = RawUrl::split(url) else {
        return url.to_string();
    };

    let path = if raw.path.is_empty() { "/" } else { raw.path };
    format!(
        "{}://{}{}{}",
        raw.scheme.to_ascii_lowercase(),
        raw.authority.to_lowercase(),
        path,
        raw.rest
    )
}

/// Short form of an identifier for UI display.
///
/// Canonicalises, strips the scheme and drops a bare `/` path:
/// `http://SimonWillison.net/` becomes `simonwillison.net`.
pub fn display_url(url: &str) -> String {
    let canonical = canonicalize_url(url);
    match RawUrl::split(&canonical) {
        Some(raw) => {
            let path = if raw.path == "/" { "" } else { raw.path };
            format!("{}{}{}", raw.authority, path, raw.rest)
        }
        None => canonical,
    }
}

/// Whether two URLs share a host (compared case-insensitively).
///
/// Scheme, port and path are ignored. Unparsable URLs never match.
pub fn verify_same_domain(url: &str, other: &str) -> bool {
    let (Ok(a), Ok(b)) = (Url::parse(url), Url::parse(other)) else {
        return false;
    };
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonicalize_url() {
        let cases = [
            ("example.com", "http://example.com/"),
            ("http://Example.com", "http://example.com/"),
            ("https://simonwillison.net/", "https://simonwillison.net/"),
            ("HTTPS://EXAMPLE.COM/Path", "https://example.com/Path"),
            ("  example.com/user  ", "http://example.com/user"),
            ("example.com?x=Y", "http://example.com/?x=Y"),
        ];
        for (input, expected) in cases {
            assert_eq!(canonicalize_url(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_canonicalize_never_lowercases_path() {
        assert_eq!(
            canonicalize_url("https://Example.COM/Users/Alice"),
            "https://example.com/Users/Alice"
        );
    }

    #[test]
    fn test_display_url() {
        let cases = [
            ("example.com", "example.com"),
            ("http://SimonWillison.net/", "simonwillison.net"),
            ("https://simonwillison.net/id", "simonwillison.net/id"),
            (
                "https://indieauth.simonwillison.net/index.php/author/simonw/",
                "indieauth.simonwillison.net/index.php/author/simonw/",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(display_url(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_verify_same_domain() {
        let cases = [
            ("https://www.example.com/", "https://www.example.com/", true),
            ("https://www.example.com/foo", "https://www.example.com/bar", true),
            ("http://WWW.example.com/", "https://www.example.com/x", true),
            ("https://www.example.com/", "https://www.example.org/", false),
            ("https://foo.example.com/", "https://www.example.com/", false),
            ("not a url", "https://www.example.com/", false),
        ];
        for (a, b, expected) in cases {
            assert_eq!(verify_same_domain(a, b), expected, "{a} vs {b}");
        }
    }

    #[test]
    fn test_raw_split() {
        let raw = RawUrl::split("https://user@Example.com:8443/a/b?q=1#frag").unwrap();
        assert_eq!(raw.scheme, "https");
        assert_eq!(raw.authority, "user@Example.com:8443");
        assert_eq!(raw.path, "/a/b");
        assert_eq!(raw.rest, "?q=1#frag");

        let raw = RawUrl::split("http://example.com").unwrap();
        assert_eq!(raw.path, "");
        assert!(RawUrl::split("example.com").is_none());
    }

    proptest! {
        #[test]
        fn prop_canonicalize_is_idempotent(input in "(https?://)?[A-Za-z0-9.-]{0,20}(/[A-Za-z0-9._~-]{0,10}){0,3}(\\?[a-z=&]{0,8})?") {
            let once = canonicalize_url(&input);
            prop_assert_eq!(canonicalize_url(&once), once);
        }

        #[test]
        fn prop_canonicalize_preserves_path_case(host in "[a-zA-Z]{1,10}\\.[a-z]{2,3}", path in "/[A-Za-z]{1,12}") {
            let canonical = canonicalize_url(&format!("https://{host}{path}"));
            prop_assert!(canonical.ends_with(&path));
            prop_assert!(canonical.contains(&host.to_lowercase()));
        }
    }
}
