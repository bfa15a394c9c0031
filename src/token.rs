use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::config::MilaConfig;
use crate::error::Error;

/// Token response from the identity provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: u64,
}

/// Exchanges an authorization code for tokens using PKCE.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the provider rejects the code, or
/// [`Error::Transport`] on network/HTTP failure.
pub(crate) async fn exchange_code(
    http: &reqwest::Client,
    config: &MilaConfig,
    code: &str,
    code_verifier: &str,
) -> Result<TokenResponse, Error> {
    let params = [
        ("grant_type", "authorization_code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code", code),
        ("code_verifier", code_verifier),
    ];
    request_token(http, config, &params, "code exchange").await
}

/// Exchanges a refresh token for a new token pair.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the provider rejects the refresh token, or
/// [`Error::Transport`] on network/HTTP failure.
pub(crate) async fn exchange_refresh(
    http: &reqwest::Client,
    config: &MilaConfig,
    refresh_token: &str,
) -> Result<TokenResponse, Error> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("refresh_token", refresh_token),
    ];
    request_token(http, config, &params, "token refresh").await
}

async fn request_token(
    http: &reqwest::Client,
    config: &MilaConfig,
    params: &[(&str, &str)],
    operation: &'static str,
) -> Result<TokenResponse, Error> {
    let response = http
        .post(config.token_url.clone())
        .form(params)
        .send()
        .await?;

    let status = response.status();
    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("{operation} rejected ({status}): {body}")));
    }

    let response = response.error_for_status()?;
    response.json().await.map_err(Into::into)
}

/// One authenticated session: an access/refresh token pair plus the absolute
/// deadlines past which each is treated as absent.
///
/// Deadlines sit at half the server-declared lifetimes so a token is never
/// used in a request that straddles its true expiry. Expiry is lazy — the
/// deadlines are checked at access time, no timers. Both tokens are replaced
/// together; the session is only ever swapped wholesale.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    access_token: String,
    refresh_token: String,
    access_deadline: Instant,
    refresh_deadline: Instant,
}

impl Session {
    pub(crate) fn new(token: &TokenResponse, now: Instant) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            access_deadline: now + Duration::from_secs(token.expires_in) / 2,
            refresh_deadline: now + Duration::from_secs(token.refresh_expires_in) / 2,
        }
    }

    /// The access token, or `None` once its half-life deadline has passed.
    pub(crate) fn access_token(&self, now: Instant) -> Option<&str> {
        (now < self.access_deadline).then_some(self.access_token.as_str())
    }

    /// The refresh token, or `None` once its half-life deadline has passed.
    pub(crate) fn refresh_token(&self, now: Instant) -> Option<&str> {
        (now < self.refresh_deadline).then_some(self.refresh_token.as_str())
    }
}
