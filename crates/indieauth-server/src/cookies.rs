//! Cookie helpers
//!
//! Cookie values are signed tokens from the engine, which are already
//! URL-safe base64 joined by `.`, so no cookie-value quoting is needed.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

/// Holds the signed pending login between `begin` and the callback
pub const PENDING_COOKIE: &str = "indieauth_pending";

/// Holds the signed actor session
pub const ACTOR_COOKIE: &str = "indieauth_actor";

/// Lifetime of the pending-login cookie in seconds
pub const PENDING_MAX_AGE: u64 = 600;

/// Lifetime of the actor session cookie in seconds
pub const ACTOR_MAX_AGE: u64 = 60 * 60 * 24 * 30;

/// `Set-Cookie` value storing `value` under `name`
pub fn set_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={value}; HttpOnly{secure}; Path=/; SameSite=Lax; Max-Age={max_age}")
}

/// `Set-Cookie` value that deletes `name`
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_set_and_clear() {
        assert_eq!(
            set_cookie(PENDING_COOKIE, "abc.def", PENDING_MAX_AGE, false),
            "indieauth_pending=abc.def; HttpOnly; Path=/; SameSite=Lax; Max-Age=600"
        );
        assert!(set_cookie(ACTOR_COOKIE, "x", 1, true).contains("; Secure;"));
        assert!(clear_cookie(ACTOR_COOKIE).ends_with("Max-Age=0"));
    }

    #[test]
    fn test_get_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; indieauth_actor=tok.sig"));
        headers.append(COOKIE, HeaderValue::from_static("indieauth_pending=p.q"));

        assert_eq!(get_cookie_value(&headers, ACTOR_COOKIE).as_deref(), Some("tok.sig"));
        assert_eq!(get_cookie_value(&headers, PENDING_COOKIE).as_deref(), Some("p.q"));
        assert_eq!(get_cookie_value(&headers, "indieauth"), None);
        assert_eq!(get_cookie_value(&HeaderMap::new(), ACTOR_COOKIE), None);
    }

    #[test]
    fn test_empty_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("indieauth_actor="));
        assert_eq!(get_cookie_value(&headers, ACTOR_COOKIE), None);
    }
}
