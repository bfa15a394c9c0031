use url::Url;

use crate::error::Error;

const DEFAULT_AUTH_URL: &str =
    "https://id.milacares.com/auth/realms/prod/protocol/openid-connect/auth";
const DEFAULT_TOKEN_URL: &str =
    "https://id.milacares.com/auth/realms/prod/protocol/openid-connect/token";
const DEFAULT_API_URL: &str = "https://api.milacares.com/graphql";
const DEFAULT_CLIENT_ID: &str = "prod-ui";
const DEFAULT_REDIRECT_URI: &str = "milacares://anyurl.com/";

/// Mila cloud endpoint configuration.
///
/// `new()` targets the production Mila cloud; every endpoint can be
/// overridden via chaining (useful for pointing at a mock server in tests).
///
/// ```rust,ignore
/// use mila_client::MilaConfig;
///
/// let config = MilaConfig::new();
/// // Optional overrides via chaining:
/// let config = config.with_api_url("https://staging.example.com/graphql".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct MilaConfig {
    pub(crate) client_id: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) api_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl Default for MilaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MilaConfig {
    /// Create a configuration targeting the production Mila cloud.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.into(),
            auth_url: DEFAULT_AUTH_URL.parse().expect("valid default URL"),
            token_url: DEFAULT_TOKEN_URL.parse().expect("valid default URL"),
            api_url: DEFAULT_API_URL.parse().expect("valid default URL"),
            redirect_uri: DEFAULT_REDIRECT_URI.parse().expect("valid default URL"),
            scopes: vec!["openid".into(), "profile".into()],
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// All variables are optional overrides of the production defaults:
    /// `MILA_AUTH_URL`, `MILA_TOKEN_URL`, `MILA_API_URL`, `MILA_CLIENT_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an override is set but not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new();

        if let Ok(url_str) = std::env::var("MILA_AUTH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MILA_AUTH_URL: {e}")))?;
            config = config.with_auth_url(url);
        }
        if let Ok(url_str) = std::env::var("MILA_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MILA_TOKEN_URL: {e}")))?;
            config = config.with_token_url(url);
        }
        if let Ok(url_str) = std::env::var("MILA_API_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("MILA_API_URL: {e}")))?;
            config = config.with_api_url(url);
        }
        if let Ok(client_id) = std::env::var("MILA_CLIENT_ID") {
            config = config.with_client_id(client_id);
        }

        Ok(config)
    }

    /// Override the identity provider's authorize endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the identity provider's token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the GraphQL API endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Override the OAuth2 client ID (default: `prod-ui`).
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Override the OAuth2 redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = uri;
        self
    }

    /// Override the OAuth2 scopes (default: `["openid", "profile"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token exchange endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// GraphQL API endpoint URL.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// `OAuth2` redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested `OAuth2` scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    // The Mila identity provider expects the scope list comma-joined.
    pub(crate) fn scope(&self) -> String {
        self.scopes.join(",")
    }
}
