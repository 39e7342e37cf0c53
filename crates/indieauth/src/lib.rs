//! # IndieAuth - Sign-in with your own URL
//!
//! Protocol engine for the IndieAuth identification flow: a user proves
//! ownership of a profile URL ("me") by being redirected through the
//! authorization endpoint that URL advertises, and the client completes an
//! authorization-code exchange protected by PKCE.
//!
//! ## Architecture
//!
//! - [`validation`] - Profile URL and client identifier grammar rules
//! - [`canonical`] - Canonicalisation and short display forms of identifiers
//! - [`link_rel`] - `<link rel>` extraction from (possibly truncated) HTML and `Link` headers
//! - [`discovery`] - Endpoint discovery with permanent-redirect canonicalisation
//! - [`pkce`] - PKCE verifier/challenge generation and verification
//! - [`signing`] - Namespaced HMAC signing capability for state and cookies
//! - [`authorize`] - Authorization request builder
//! - [`callback`] - Callback verification state machine
//! - [`actor`] - Signed actor sessions
//! - [`policy`] - Access policy gate and host-facing menu entry
//! - [`client`] - [`IndieAuthClient`] facade tying the flow together
//! - [`http`] - Injectable HTTP transport
//! - `test_utils` - In-memory transport stubs (feature `test-utils`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use indieauth::{ClientUrls, HmacSigner, IndieAuthClient, IndieAuthConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Arc::new(HmacSigner::new(b"a long random secret"));
//! let client = IndieAuthClient::new(IndieAuthConfig::default(), signer)?;
//! let urls = ClientUrls::from_base(&url::Url::parse("https://app.example.com/")?, "/-/indieauth")?;
//!
//! // Step 1: user submits "example.com"
//! let start = client.begin("example.com", &urls).await?;
//! println!("redirect to {}", start.redirect.url);
//! // store `start.pending_cookie` in an HttpOnly cookie
//!
//! // Step 2: the authorization endpoint redirects back with ?state=..&code=..
//! # let (state, code, cookie) = (String::new(), String::new(), start.pending_cookie.clone());
//! let done = client
//!     .complete(indieauth::CallbackParams::new(&state, &code, Some(&cookie)), &urls)
//!     .await?;
//! println!("signed in as {}", done.actor.display);
//! # Ok(())
//! # }
//! ```
//!
//! ## Standards
//!
//! - IndieAuth (W3C Note / living standard) - profile URL and client identifier rules
//! - RFC 7636 - Proof Key for Code Exchange (S256 only)
//! - RFC 8288 - Web Linking (`Link` header)

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod actor;
pub mod authorize;
pub mod callback;
pub mod canonical;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod link_rel;
pub mod pkce;
pub mod policy;
pub mod signing;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod test_utils;
pub mod validation;
pub mod view;

#[doc(inline)]
pub use actor::{Actor, ActorSession};
#[doc(inline)]
pub use authorize::{AuthState, AuthorizationRedirect, AuthorizationRequest, ClientUrls, PendingLogin};
#[doc(inline)]
pub use callback::{CallbackError, CallbackParams, CallbackVerifier};
#[doc(inline)]
pub use canonical::{canonicalize_url, display_url, verify_same_domain};
#[doc(inline)]
pub use client::{CompletedLogin, IndieAuthClient, LoginStart};
#[doc(inline)]
pub use config::{DiscoveryConfig, IndieAuthConfig};
#[doc(inline)]
pub use discovery::{DiscoveryError, DiscoveryResult, EndpointDiscoverer};
#[doc(inline)]
pub use error::{Error, LoginError, Result};
#[doc(inline)]
pub use self::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
#[doc(inline)]
pub use pkce::{PkceError, PkcePair};
#[doc(inline)]
pub use policy::{AccessDecision, AllowList, MenuLink};
#[doc(inline)]
pub use signing::{HmacSigner, SignatureError, Signer};
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{RecordedRequest, StaticTransport, StubResponse};
#[doc(inline)]
pub use validation::{verify_client_identifier, verify_profile_url};
#[doc(inline)]
pub use view::LoginView;
