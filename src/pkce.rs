use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE verifier/challenge pair for one login attempt (RFC 7636, S256).
///
/// Generated fresh per attempt and consumed by exactly one code exchange —
/// never reused.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Code verifier sent with the token exchange.
    pub verifier: String,
    /// S256 code challenge sent with the authorization request.
    pub challenge: String,
}

impl PkceChallenge {
    /// Generates a fresh verifier/challenge pair.
    ///
    /// The verifier is 48 random bytes base64url-encoded into a 64-character
    /// URL-safe string (within RFC 7636's 43–128 bounds); the challenge is
    /// `BASE64URL(SHA256(verifier))`.
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 48] = rand::rng().random();
        let verifier = URL_SAFE_NO_PAD.encode(random_bytes);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Computes the S256 code challenge for a verifier.
fn challenge_for(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
