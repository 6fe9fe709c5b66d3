//! PKCE (RFC 7636) verifier and S256 challenge.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Random bytes drawn per attempt, before filtering to alphanumerics.
const VERIFIER_RANDOM_BYTES: usize = 40;

/// RFC 7636 lower bound on verifier length.
const MIN_VERIFIER_LEN: usize = 43;

/// PKCE code verifier, restricted to `[A-Za-z0-9]`.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a fresh verifier from the OS random source
    ///
    /// Filtering `-` and `_` out of the base64url encoding can in principle
    /// shorten it below the RFC minimum, so such draws are discarded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_RANDOM_BYTES];
        loop {
            OsRng.fill_bytes(&mut bytes);
            let verifier = Self::from_random_bytes(&bytes);
            if verifier.0.len() >= MIN_VERIFIER_LEN {
                return verifier;
            }
        }
    }

    fn from_random_bytes(bytes: &[u8]) -> Self {
        let encoded = URL_SAFE_NO_PAD.encode(bytes);
        Self(encoded.chars().filter(|c| c.is_ascii_alphanumeric()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// S256 challenge: base64url(SHA-256(verifier)) without padding
    pub fn challenge(&self) -> String {
        code_challenge(&self.0)
    }
}

// Verifiers are secrets; keep them out of logs.
impl fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PkceVerifier(..)")
    }
}

pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
