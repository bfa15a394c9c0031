/// Errors surfaced by the Mila client.
///
/// Nothing here is recovered internally; every variant propagates to the
/// caller unchanged. Repeated failures are the caller's to surface.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identity provider's login page could not be understood
    /// (no form action found — the page markup has likely changed).
    #[error("login page parse error: {0}")]
    Parse(String),

    /// Bad credentials, or a code/refresh-token exchange the provider
    /// rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or HTTP-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// GraphQL error payload in an otherwise successful response.
    #[error("GraphQL error: {0}")]
    Protocol(String),

    /// Requested appliance id absent from the owner's set.
    #[error("appliance not found: {0}")]
    NotFound(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
