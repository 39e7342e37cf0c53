//! Callback verification
//!
//! Runs when the authorization endpoint sends the user back with `state` and
//! `code`. The checks run in a fixed order and the first failure is terminal:
//!
//! 1. `state` verifies under the state namespace ([`CallbackError::InvalidState`])
//! 2. the pending login cookie verifies and carries a verifier and the
//!    original identity ([`CallbackError::InvalidCookie`])
//! 3. the code exchange POST answers `200` ([`CallbackError::Upstream`])
//! 4. the response names a `me` ([`CallbackError::MissingIdentity`])
//! 5. `me` is on the same host as the original identity ([`CallbackError::DomainMismatch`])
//! 6. `me` advertises the same authorization endpoint that issued the code
//!    ([`CallbackError::EndpointMismatch`])
//!
//! Only when every check passes is an [`Actor`] produced.

use std::sync::Arc;

use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::actor::Actor;
use crate::authorize::{AuthState, ClientUrls, PendingLogin};
use crate::canonical::verify_same_domain;
use crate::discovery::{DiscoveryError, EndpointDiscoverer};
use crate::http::{HttpRequest, HttpTransport, TransportError};
use crate::signing::Signer;

/// Largest code exchange response that will be read
const MAX_EXCHANGE_RESPONSE: usize = 256 * 1024;

/// Terminal failures of the callback.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    /// `state` is missing, forged or signed for another purpose
    #[error("Invalid state")]
    InvalidState,

    /// The pending login cookie is missing, forged or incomplete
    #[error("Invalid indieauth cookie")]
    InvalidCookie,

    /// The code exchange did not answer 200
    #[error("Invalid response from authorization server")]
    Upstream {
        /// Status returned by the authorization endpoint
        status: u16,
    },

    /// The code exchange response has no `me`
    #[error("Invalid authorization_code response from authorization server")]
    MissingIdentity,

    /// The returned `me` is on a different host than the one the user entered
    #[error("\"me\" value returned by authorization server had a domain that did not match the initial URL")]
    DomainMismatch {
        /// Identity returned by the authorization server
        me: String,
        /// Identity the flow started with
        original_me: String,
    },

    /// The returned `me` advertises a different authorization endpoint
    #[error("\"me\" value resolves to a different authorization_endpoint")]
    EndpointMismatch {
        /// Endpoint that issued the code
        expected: String,
        /// Endpoint advertised by the returned `me`, if any
        found: Option<String>,
    },

    /// The code exchange request failed
    #[error("Could not reach authorization server: {0}")]
    Transport(#[from] TransportError),

    /// Re-discovering the returned `me` failed
    #[error("Could not verify \"me\" value: {0}")]
    Discovery(#[from] DiscoveryError),
}

impl CallbackError {
    /// HTTP status for the error page: 400 for a bad `state`, 200 otherwise
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidState => StatusCode::BAD_REQUEST,
            _ => StatusCode::OK,
        }
    }

    /// Message to render on the login form
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Parameters of the redirect back from the authorization endpoint
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// `state` query parameter
    pub state: String,
    /// `code` query parameter
    pub code: String,
    /// Value of the pending login cookie, if the browser sent one
    pub pending_cookie: Option<String>,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackParams")
            .field("has_state", &!self.state.is_empty())
            .field("has_cookie", &self.pending_cookie.is_some())
            .finish_non_exhaustive()
    }
}

impl CallbackParams {
    /// Collect the callback parameters
    pub fn new(
        state: impl Into<String>,
        code: impl Into<String>,
        pending_cookie: Option<impl Into<String>>,
    ) -> Self {
        Self {
            state: state.into(),
            code: code.into(),
            pending_cookie: pending_cookie.map(Into::into),
        }
    }
}

/// Verifies callbacks and exchanges codes
#[derive(Clone)]
pub struct CallbackVerifier {
    signer: Arc<dyn Signer>,
    transport: Arc<dyn HttpTransport>,
    discoverer: EndpointDiscoverer,
}

impl std::fmt::Debug for CallbackVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackVerifier")
            .field("discoverer", &self.discoverer)
            .finish_non_exhaustive()
    }
}

impl CallbackVerifier {
    /// Create a verifier; `discoverer` is used for endpoint re-validation
    pub fn new(
        signer: Arc<dyn Signer>,
        transport: Arc<dyn HttpTransport>,
        discoverer: EndpointDiscoverer,
    ) -> Self {
        Self {
            signer,
            transport,
            discoverer,
        }
    }

    /// Run every callback check and return the verified actor
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`CallbackError`].
    pub async fn verify(&self, params: &CallbackParams, urls: &ClientUrls) -> Result<Actor, CallbackError> {
        let state = AuthState::open(self.signer.as_ref(), &params.state).map_err(|e| {
            warn!("Rejected callback state: {}", e);
            CallbackError::InvalidState
        })?;
        let authorization_endpoint = Url::parse(&state.authorization_endpoint).map_err(|e| {
            warn!("Signed state carries an unusable endpoint: {}", e);
            CallbackError::InvalidState
        })?;

        let Some(cookie) = params.pending_cookie.as_deref() else {
            warn!("Callback without a pending login cookie");
            return Err(CallbackError::InvalidCookie);
        };
        let pending = PendingLogin::open(self.signer.as_ref(), cookie).map_err(|e| {
            warn!("Rejected pending login cookie: {}", e);
            CallbackError::InvalidCookie
        })?;

        let info = self.exchange_code(&authorization_endpoint, &params.code, &pending, urls).await?;

        let Some(me) = info.get("me").and_then(Value::as_str) else {
            warn!("Code exchange response from {} has no me", authorization_endpoint);
            return Err(CallbackError::MissingIdentity);
        };

        if !verify_same_domain(me, &pending.original_me) {
            warn!("Returned me {} does not match the domain of {}", me, pending.original_me);
            return Err(CallbackError::DomainMismatch {
                me: me.to_string(),
                original_me: pending.original_me,
            });
        }

        let discovered = self.discoverer.discover(me).await?;
        let found = discovered.authorization_endpoint.as_ref().map(Url::as_str);
        if found != Some(state.authorization_endpoint.as_str()) {
            warn!(
                "Returned me {} advertises {:?}, expected {}",
                me, found, state.authorization_endpoint
            );
            return Err(CallbackError::EndpointMismatch {
                expected: state.authorization_endpoint,
                found: found.map(str::to_string),
            });
        }

        let scope = info.get("scope").and_then(Value::as_str);
        let actor = Actor::new(discovered.canonical_me.as_str(), scope, info.get("profile"));
        info!("Signed in {}", actor.me);
        Ok(actor)
    }

    async fn exchange_code(
        &self,
        authorization_endpoint: &Url,
        code: &str,
        pending: &PendingLogin,
        urls: &ClientUrls,
    ) -> Result<Map<String, Value>, CallbackError> {
        let request = HttpRequest::post_form(
            authorization_endpoint.clone(),
            [
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", urls.client_id.as_str()),
                ("redirect_uri", urls.redirect_uri.as_str()),
                ("code_verifier", pending.verifier.as_str()),
            ],
        )
        .with_accept("application/json");

        let mut response = self.transport.send(request).await?;
        if response.status != StatusCode::OK {
            warn!("Code exchange at {} returned {}", authorization_endpoint, response.status);
            return Err(CallbackError::Upstream {
                status: response.status.as_u16(),
            });
        }

        let body = response.read_prefix(MAX_EXCHANGE_RESPONSE).await?;
        Ok(parse_exchange_response(&body))
    }
}

/// Parse a code exchange body: JSON first, form encoding as a fallback.
///
/// JSON that is not an object yields an empty map.
fn parse_exchange_response(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => Map::new(),
        Err(_) => url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect(),
    }
}
