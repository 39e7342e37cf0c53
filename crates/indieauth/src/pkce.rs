//! PKCE (RFC 7636) verifier and S256 challenge handling

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Shortest verifier RFC 7636 allows
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Longest verifier RFC 7636 allows
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Verifier length used by [`PkcePair::generate_default`]
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

/// PKCE errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PkceError {
    /// Requested verifier length is odd or outside 43..=128
    #[error("PKCE verifier length must be even and between 43 and 128, got {0}")]
    InvalidLength(usize),

    /// The system random number generator failed
    #[error("Random number generator failure")]
    Random,

    /// A challenge was not valid base64url
    #[error("Invalid code challenge encoding: {0}")]
    InvalidEncoding(String),
}

/// A PKCE verifier and its S256 challenge
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    /// Secret verifier: lower-case hex, sent only in the code exchange
    pub verifier: String,
    /// `base64url-nopad(SHA-256(verifier))`, sent in the authorization URL
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

impl PkcePair {
    /// Generate a fresh pair with a `length`-character verifier
    ///
    /// # Errors
    ///
    /// Returns [`PkceError::InvalidLength`] unless `length` is even and in
    /// `43..=128`, and [`PkceError::Random`] if the RNG fails.
    pub fn generate(length: usize) -> Result<Self, PkceError> {
        if length % 2 != 0 || !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
            return Err(PkceError::InvalidLength(length));
        }

        let mut bytes = vec![0u8; length / 2];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| PkceError::Random)?;

        let verifier = hex::encode(bytes);
        let challenge = challenge_for(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// Generate a pair with a 64-character verifier
    ///
    /// # Errors
    ///
    /// Returns [`PkceError::Random`] if the RNG fails.
    pub fn generate_default() -> Result<Self, PkceError> {
        Self::generate(DEFAULT_VERIFIER_LENGTH)
    }

    /// The challenge method sent alongside the challenge
    pub fn method(&self) -> &'static str {
        "S256"
    }
}

/// S256 challenge for `verifier`
pub fn challenge_for(verifier: &str) -> String {
    encode_challenge(&Sha256::digest(verifier.as_bytes()))
}

/// Whether `challenge` is the S256 challenge of `verifier`
pub fn verify(verifier: &str, challenge: &str) -> bool {
    match decode_challenge(challenge) {
        Ok(digest) => digest.as_slice() == Sha256::digest(verifier.as_bytes()).as_slice(),
        Err(_) => false,
    }
}

/// Encode a digest as base64url without padding
pub fn encode_challenge(digest: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(digest)
}

/// Decode a base64url challenge, with or without `=` padding
///
/// # Errors
///
/// Returns [`PkceError::InvalidEncoding`] if the input is not base64url.
pub fn decode_challenge(challenge: &str) -> Result<Vec<u8>, PkceError> {
    let trimmed = challenge.trim_end_matches('=');
    let padding = (4 - trimmed.len() % 4) % 4;
    let padded = format!("{trimmed}{}", "=".repeat(padding));
    URL_SAFE
        .decode(padded)
        .map_err(|e| PkceError::InvalidEncoding(e.to_string()))
}
