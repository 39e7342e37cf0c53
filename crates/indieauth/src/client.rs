//! The IndieAuth client facade
//!
//! [`IndieAuthClient`] wires validation, discovery, request building and
//! callback verification together behind the two calls a host needs:
//! [`IndieAuthClient::begin`] when the user submits an identifier and
//! [`IndieAuthClient::complete`] when the authorization endpoint sends them
//! back.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::actor::{Actor, ActorSession};
use crate::authorize::{AuthorizationRedirect, ClientUrls, PendingLogin, build_authorization_url};
use crate::callback::{CallbackParams, CallbackVerifier};
use crate::canonical::canonicalize_url;
use crate::config::IndieAuthConfig;
use crate::discovery::EndpointDiscoverer;
use crate::error::{LoginError, Result};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::policy::{self, AccessDecision, MenuLink};
use crate::signing::Signer;
use crate::validation::verify_profile_url;

/// Outcome of [`IndieAuthClient::begin`]
#[derive(Debug, Clone)]
pub struct LoginStart {
    /// Canonical profile URL after permanent redirects
    pub me: String,
    /// Redirect to the authorization endpoint
    pub redirect: AuthorizationRedirect,
    /// Signed pending login; store it in a short-lived HttpOnly cookie
    pub pending_cookie: String,
}

/// Outcome of [`IndieAuthClient::complete`]
#[derive(Debug, Clone)]
pub struct CompletedLogin {
    /// The verified actor
    pub actor: Actor,
    /// Signed actor session for the session cookie
    pub session_cookie: String,
}

/// IndieAuth sign-in client
#[derive(Clone)]
pub struct IndieAuthClient {
    config: IndieAuthConfig,
    signer: Arc<dyn Signer>,
    discoverer: EndpointDiscoverer,
    verifier: CallbackVerifier,
}

impl std::fmt::Debug for IndieAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndieAuthClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IndieAuthClient {
    /// Create a client that talks to the network through `reqwest`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the HTTP client cannot be built.
    pub fn new(config: IndieAuthConfig, signer: Arc<dyn Signer>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.discovery)?);
        Ok(Self::with_transport(config, signer, transport))
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(
        config: IndieAuthConfig,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let discoverer = EndpointDiscoverer::new(Arc::clone(&transport), config.discovery.clone());
        let verifier = CallbackVerifier::new(Arc::clone(&signer), transport, discoverer.clone());
        Self {
            config,
            signer,
            discoverer,
            verifier,
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &IndieAuthConfig {
        &self.config
    }

    /// The signing capability, for hosts that sign their own cookies with it
    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    /// Start a login for a user-entered identifier
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Login`] for user-facing failures: an empty or
    /// invalid identifier, a discovery failure, or no advertised
    /// authorization endpoint. Signing and RNG failures are returned as their
    /// own variants.
    #[instrument(skip(self, urls))]
    pub async fn begin(&self, identifier: &str, urls: &ClientUrls) -> Result<LoginStart> {
        if identifier.trim().is_empty() {
            return Err(LoginError::InvalidIdentifier.into());
        }
        let me = canonicalize_url(identifier);
        if !verify_profile_url(&me) {
            debug!("Rejected identifier {:?}", me);
            return Err(LoginError::InvalidIdentifier.into());
        }

        let discovered = self.discoverer.discover(&me).await.map_err(LoginError::from)?;
        let authorization_endpoint = discovered
            .authorization_endpoint
            .ok_or(LoginError::NoAuthorizationEndpoint)?;
        let me = discovered.canonical_me.to_string();

        let redirect = build_authorization_url(
            &authorization_endpoint,
            &urls.client_id,
            &urls.redirect_uri,
            &me,
            self.signer.as_ref(),
            None,
        )?;
        let pending_cookie = PendingLogin {
            verifier: redirect.verifier.clone(),
            original_me: me.clone(),
        }
        .seal(self.signer.as_ref())?;

        Ok(LoginStart {
            me,
            redirect,
            pending_cookie,
        })
    }

    /// Finish a login from the callback parameters
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Callback`] for every verification failure.
    #[instrument(skip_all)]
    pub async fn complete(&self, params: CallbackParams, urls: &ClientUrls) -> Result<CompletedLogin> {
        let actor = self.verifier.verify(&params, urls).await?;
        let session_cookie = ActorSession::new(actor.clone()).seal(self.signer.as_ref())?;
        Ok(CompletedLogin {
            actor,
            session_cookie,
        })
    }

    /// The actor carried by a session cookie; invalid cookies yield `None`
    pub fn actor_from_session(&self, cookie: &str) -> Option<Actor> {
        ActorSession::open(self.signer.as_ref(), cookie).map(|session| session.actor)
    }

    /// Access decision for `action` under the configured allow-list
    pub fn access_decision(&self, actor: Option<&Actor>, action: &str) -> AccessDecision {
        policy::access_decision(actor, action, &self.config)
    }

    /// Menu entry to offer the host
    pub fn menu_entry(&self, actor: Option<&Actor>, login_path: &str) -> Option<MenuLink> {
        policy::menu_entry(actor, login_path)
    }
}
