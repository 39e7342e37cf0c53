//! Authorization request building
//!
//! Produces the redirect to the authorization endpoint together with the two
//! signed tokens that tie the callback back to it: the `state` parameter
//! (which endpoint was used) and the pending login cookie (the PKCE verifier
//! and the identity the user typed).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::pkce::PkcePair;
use crate::signing::{PENDING_NAMESPACE, STATE_NAMESPACE, SignatureError, Signer, sign_json, unsign_json};
use crate::validation::verify_client_identifier;

/// Payload of the `state` parameter: `{"a": authorization_endpoint}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Endpoint the user was sent to
    #[serde(rename = "a")]
    pub authorization_endpoint: String,
}

impl AuthState {
    /// Sign under the state namespace
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Serialize`] if serialization fails.
    pub fn seal(&self, signer: &dyn Signer) -> std::result::Result<String, SignatureError> {
        sign_json(signer, self, STATE_NAMESPACE)
    }

    /// Verify a `state` value
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the signature or payload is invalid.
    pub fn open(signer: &dyn Signer, token: &str) -> std::result::Result<Self, SignatureError> {
        unsign_json(signer, token, STATE_NAMESPACE)
    }
}

/// Payload of the pending login cookie: `{"v": verifier, "m": me}`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// PKCE verifier for this attempt
    #[serde(rename = "v")]
    pub verifier: String,
    /// Canonical profile URL the user started with
    #[serde(rename = "m")]
    pub original_me: String,
}

impl std::fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLogin")
            .field("verifier", &"<redacted>")
            .field("original_me", &self.original_me)
            .finish()
    }
}

impl PendingLogin {
    /// Sign under the pending login namespace
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Serialize`] if serialization fails.
    pub fn seal(&self, signer: &dyn Signer) -> std::result::Result<String, SignatureError> {
        sign_json(signer, self, PENDING_NAMESPACE)
    }

    /// Verify a cookie value; both fields must be present and non-empty
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the signature or payload is invalid.
    pub fn open(signer: &dyn Signer, token: &str) -> std::result::Result<Self, SignatureError> {
        let pending: Self = unsign_json(signer, token, PENDING_NAMESPACE)?;
        if pending.verifier.is_empty() || pending.original_me.is_empty() {
            return Err(SignatureError::Payload("empty verifier or me".to_string()));
        }
        Ok(pending)
    }
}

/// The client's own URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUrls {
    /// Client identifier: the absolute URL of the login page
    pub client_id: Url,
    /// Where the authorization endpoint sends the user back: `<client_id>/done`
    pub redirect_uri: Url,
}

impl ClientUrls {
    /// Derive the client URLs from the application's base URL and login path
    ///
    /// A client identifier that fails [`verify_client_identifier`] is still
    /// returned, with a warning; many authorization servers will refuse it.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the URLs cannot be built.
    pub fn from_base(base: &Url, login_path: &str) -> std::result::Result<Self, url::ParseError> {
        let client_id = base.join(login_path)?;
        let redirect_uri = Url::parse(&format!(
            "{}/done",
            client_id.as_str().trim_end_matches('/')
        ))?;

        let urls = Self {
            client_id,
            redirect_uri,
        };
        if !urls.is_valid_client_identifier() {
            warn!("{} is not a valid IndieAuth client identifier", urls.client_id);
        }
        Ok(urls)
    }

    /// Whether `client_id` satisfies the client identifier rules
    pub fn is_valid_client_identifier(&self) -> bool {
        verify_client_identifier(self.client_id.as_str())
    }
}

/// Everything needed to send a user to their authorization endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Discovered authorization endpoint
    pub authorization_endpoint: Url,
    /// Client identifier
    pub client_id: Url,
    /// Callback URL
    pub redirect_uri: Url,
    /// Canonical profile URL
    pub me: String,
    /// Requested scope; identification-only flows leave this empty
    pub scope: Option<String>,
}

impl AuthorizationRequest {
    /// Generate a PKCE pair and state, and build the redirect
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Pkce`] if the RNG fails and
    /// [`crate::Error::Signature`] if the state cannot be signed.
    pub fn build(&self, signer: &dyn Signer) -> Result<AuthorizationRedirect> {
        let pkce = PkcePair::generate_default()?;
        let state = AuthState {
            authorization_endpoint: self.authorization_endpoint.to_string(),
        }
        .seal(signer)?;

        let mut url = self.authorization_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", self.client_id.as_str())
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", pkce.method())
                .append_pair("me", &self.me);
            if let Some(scope) = &self.scope {
                query.append_pair("scope", scope);
            }
        }
        debug!("Built authorization URL for {} at {}", self.me, self.authorization_endpoint);

        Ok(AuthorizationRedirect {
            url,
            state,
            verifier: pkce.verifier,
        })
    }
}

/// Result of [`AuthorizationRequest::build`]
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    /// Where to redirect the browser
    pub url: Url,
    /// Signed state, also embedded in `url`
    pub state: String,
    /// PKCE verifier; never part of `url`
    pub verifier: String,
}

impl std::fmt::Debug for AuthorizationRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRedirect")
            .field("url", &self.url.as_str())
            .field("verifier", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Build an authorization redirect in one call
///
/// # Errors
///
/// See [`AuthorizationRequest::build`].
pub fn build_authorization_url(
    authorization_endpoint: &Url,
    client_id: &Url,
    redirect_uri: &Url,
    me: &str,
    signer: &dyn Signer,
    scope: Option<&str>,
) -> Result<AuthorizationRedirect> {
    AuthorizationRequest {
        authorization_endpoint: authorization_endpoint.clone(),
        client_id: client_id.clone(),
        redirect_uri: redirect_uri.clone(),
        me: me.to_string(),
        scope: scope.map(str::to_string),
    }
    .build(signer)
}
