//! Namespaced signing capability
//!
//! Every token that crosses the browser (the `state` parameter, the pending
//! login cookie and the actor session cookie) is signed under its own
//! namespace. A token signed for one namespace never verifies under another,
//! so a `state` value can't be replayed as a cookie or vice versa.
//!
//! The capability is a trait object handed to the components that need it;
//! hosts with their own signing scheme implement [`Signer`] themselves.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Namespace of the `state` parameter
pub const STATE_NAMESPACE: &str = "indieauth-state";

/// Namespace of the pending login (PKCE) cookie
pub const PENDING_NAMESPACE: &str = "indieauth-cookie";

/// Namespace of the actor session cookie
pub const ACTOR_NAMESPACE: &str = "actor";

/// Signature errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Token is not `payload.signature` base64url
    #[error("Malformed signed token")]
    Malformed,

    /// Signature does not match payload and namespace
    #[error("Signature verification failed")]
    BadSignature,

    /// Signature is valid but the payload has the wrong shape
    #[error("Invalid signed payload: {0}")]
    Payload(String),

    /// The value could not be serialized for signing
    #[error("Failed to serialize payload: {0}")]
    Serialize(String),

    /// Key generation failed
    #[error("Failed to generate signing key")]
    KeyGeneration,
}

/// Sign and verify byte payloads under a namespace
pub trait Signer: Send + Sync {
    /// Produce a token carrying `payload`, bound to `namespace`
    fn sign(&self, payload: &[u8], namespace: &str) -> String;

    /// Recover the payload of a token produced by [`Signer::sign`]
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the token is malformed or was not signed
    /// by this signer under `namespace`.
    fn unsign(&self, token: &str, namespace: &str) -> Result<Vec<u8>, SignatureError>;
}

/// Sign a serializable value as JSON
///
/// # Errors
///
/// Returns [`SignatureError::Serialize`] if `value` cannot be serialized.
pub fn sign_json<T: Serialize + ?Sized>(
    signer: &dyn Signer,
    value: &T,
    namespace: &str,
) -> Result<String, SignatureError> {
    let payload = serde_json::to_vec(value).map_err(|e| SignatureError::Serialize(e.to_string()))?;
    Ok(signer.sign(&payload, namespace))
}

/// Verify a token and deserialize its JSON payload
///
/// # Errors
///
/// Returns [`SignatureError`] if verification fails or the payload does not
/// deserialize into `T`.
pub fn unsign_json<T: DeserializeOwned>(
    signer: &dyn Signer,
    token: &str,
    namespace: &str,
) -> Result<T, SignatureError> {
    let payload = signer.unsign(token, namespace)?;
    serde_json::from_slice(&payload).map_err(|e| SignatureError::Payload(e.to_string()))
}

/// HMAC-SHA256 [`Signer`]
///
/// Each namespace gets its own key, derived from the root secret as
/// `HMAC(root, "indieauth.signer:" + namespace)`. Tokens have the form
/// `base64url(payload).base64url(tag)`.
pub struct HmacSigner {
    root: hmac::Key,
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl HmacSigner {
    /// Create a signer from a root secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            root: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    /// Create a signer with a random secret; tokens do not survive a restart
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::KeyGeneration`] if the RNG fails.
    pub fn generate() -> Result<Self, SignatureError> {
        let mut secret = [0u8; 32];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| SignatureError::KeyGeneration)?;
        Ok(Self::new(&secret))
    }

    fn namespace_key(&self, namespace: &str) -> hmac::Key {
        let derived = hmac::sign(&self.root, format!("indieauth.signer:{namespace}").as_bytes());
        hmac::Key::new(hmac::HMAC_SHA256, derived.as_ref())
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &[u8], namespace: &str) -> String {
        let tag = hmac::sign(&self.namespace_key(namespace), payload);
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(tag.as_ref())
        )
    }

    fn unsign(&self, token: &str, namespace: &str) -> Result<Vec<u8>, SignatureError> {
        let (payload, tag) = token.split_once('.').ok_or(SignatureError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SignatureError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| SignatureError::Malformed)?;
        hmac::verify(&self.namespace_key(namespace), &payload, &tag)
            .map_err(|_| SignatureError::BadSignature)?;
        Ok(payload)
    }
}
