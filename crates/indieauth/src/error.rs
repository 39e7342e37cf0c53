//! Crate-level error types

use thiserror::Error;

use crate::callback::CallbackError;
use crate::discovery::DiscoveryError;
use crate::http::TransportError;
use crate::pkce::PkceError;
use crate::signing::SignatureError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure the engine can report
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Submitting an identifier failed
    #[error(transparent)]
    Login(#[from] LoginError),

    /// Completing the callback failed
    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// Endpoint discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Outbound HTTP failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Signing or verifying a token failed
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// PKCE generation failed
    #[error(transparent)]
    Pkce(#[from] PkceError),

    /// A URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Text to show the user on the login form, if this error has one
    ///
    /// Internal failures (signing, RNG, URL construction) return `None`;
    /// hosts should treat them as server errors.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Login(e) => Some(e.to_string()),
            Self::Callback(e) => Some(e.user_message()),
            Self::Discovery(e) => Some(LoginError::Discovery(e.clone()).to_string()),
            Self::Transport(_) | Self::Signature(_) | Self::Pkce(_) | Self::Url(_) => None,
        }
    }
}

/// Failures while starting a login from a submitted identifier
#[derive(Debug, Clone, Error)]
pub enum LoginError {
    /// Empty input, or not a valid profile URL after canonicalisation
    #[error("Invalid IndieAuth identifier")]
    InvalidIdentifier,

    /// The identifier's page could not be fetched
    #[error("Invalid IndieAuth identifier: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The page does not advertise an authorization endpoint
    #[error("Invalid IndieAuth identifier - no authorization_endpoint found")]
    NoAuthorizationEndpoint,
}
