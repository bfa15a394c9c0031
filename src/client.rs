use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::appliance::{quantize_fan_speed, Appliance};
use crate::config::MilaConfig;
use crate::error::Error;
use crate::graphql::{self, AppliancesData, Profile, ProfileData};
use crate::login;
use crate::pkce::PkceChallenge;
use crate::token::{self, Session, TokenResponse};

/// How long a fetched appliance set stays fresh. Collapses bursty polling
/// into one upstream call per window.
const APPLIANCE_CACHE_TTL: Duration = Duration::from_secs(10);

/// Owner credentials for the Mila cloud. Immutable after construction.
struct Credentials {
    email: String,
    password: String,
}

// Never expose the password through Debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cached appliance set, valid for [`APPLIANCE_CACHE_TTL`] from fetch or
/// until a mutation invalidates it.
struct CacheEntry {
    appliances: Arc<Vec<Appliance>>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(appliances: Arc<Vec<Appliance>>, fetched_at: Instant) -> Self {
        Self {
            appliances,
            fetched_at,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.fetched_at + APPLIANCE_CACHE_TTL
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("appliances", &self.appliances.len())
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Authenticated client for the Mila air-purifier cloud.
///
/// Owns the full login/token lifecycle: the first authenticated call performs
/// the PKCE login flow, later calls reuse the session until its half-life
/// deadline, then refresh, then fall back to a fresh login. Appliance reads
/// go through a short-TTL cache that control commands invalidate.
///
/// ```rust,ignore
/// use mila_client::{MilaClient, MilaConfig};
///
/// let client = MilaClient::new(MilaConfig::new(), "you@example.com", "hunter2");
/// let appliances = client.get_appliances().await?;
/// ```
#[derive(Debug)]
pub struct MilaClient {
    config: MilaConfig,
    credentials: Credentials,
    http: reqwest::Client,
    session: Mutex<Option<Session>>,
    cache: Mutex<Option<CacheEntry>>,
}

impl MilaClient {
    /// Create a client for one Mila account.
    #[must_use]
    pub fn new(
        config: MilaConfig,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            config,
            credentials: Credentials {
                email: email.into(),
                password: password.into(),
            },
            http: reqwest::Client::new(),
            session: Mutex::new(None),
            cache: Mutex::new(None),
        }
    }

    /// Create a client from environment variables.
    ///
    /// # Required env vars
    /// - `MILA_EMAIL`: account email
    /// - `MILA_PASSWORD`: account password
    ///
    /// Endpoint overrides are read per [`MilaConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required variables are missing or an
    /// endpoint override is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let email = std::env::var("MILA_EMAIL")
            .map_err(|_| Error::Config("MILA_EMAIL is required".into()))?;
        let password = std::env::var("MILA_PASSWORD")
            .map_err(|_| Error::Config("MILA_PASSWORD is required".into()))?;

        Ok(Self::new(MilaConfig::from_env()?, email, password))
    }

    /// Use a custom HTTP client for token and API calls (connection pool
    /// reuse or testing). The login flow always builds its own short-lived
    /// client, since each attempt needs a private cookie jar and disabled
    /// redirects.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    // ── Session acquisition ────────────────────────────────────────

    /// Returns a bearer token that is valid for the duration of one request.
    ///
    /// The whole decision runs under the session lock, so concurrent callers
    /// that miss the fast path serialize and exactly one exchange happens
    /// per expiry; everyone else reuses the freshly stored session.
    async fn access_token(&self) -> Result<String, Error> {
        let mut slot = self.session.lock().await;
        let now = Instant::now();

        if let Some(session) = slot.as_ref() {
            if let Some(access) = session.access_token(now) {
                return Ok(access.to_owned());
            }
        }

        let refresh = slot
            .as_ref()
            .and_then(|session| session.refresh_token(now))
            .map(str::to_owned);

        let token = match refresh {
            Some(refresh_token) => {
                tracing::debug!("access token past half-life, refreshing");
                match token::exchange_refresh(&self.http, &self.config, &refresh_token).await {
                    Ok(token) => token,
                    Err(err @ Error::Auth(_)) => {
                        // The provider rejected the refresh token; drop the
                        // session so the next call performs a full login.
                        *slot = None;
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            None => {
                tracing::info!("no usable session, performing login");
                self.login().await?
            }
        };

        let access = token.access_token.clone();
        *slot = Some(Session::new(&token, Instant::now()));
        Ok(access)
    }

    async fn login(&self) -> Result<TokenResponse, Error> {
        let pkce = PkceChallenge::generate();
        let code = login::login(
            &self.config,
            &self.credentials.email,
            &self.credentials.password,
            &pkce,
        )
        .await?;
        token::exchange_code(&self.http, &self.config, &code, &pkce.verifier).await
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Fetches the authenticated owner's profile.
    ///
    /// # Errors
    ///
    /// Any of [`Error::Parse`], [`Error::Auth`], [`Error::Transport`],
    /// [`Error::Protocol`] from the login flow or the API call.
    pub async fn get_profile(&self) -> Result<Profile, Error> {
        let access = self.access_token().await?;
        let data: ProfileData = graphql::execute(
            &self.http,
            &self.config.api_url,
            &access,
            graphql::PROFILE_QUERY,
        )
        .await?;
        Ok(data.owner.profile)
    }

    /// Fetches all of the owner's appliances with their latest sensor
    /// readings.
    ///
    /// Reads inside the cache window return the same shared `Arc` (no copy,
    /// no upstream call). A concurrent burst of misses performs a single
    /// fetch; the rest wait and reuse the fresh entry.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_profile`](Self::get_profile).
    pub async fn get_appliances(&self) -> Result<Arc<Vec<Appliance>>, Error> {
        let mut cache = self.cache.lock().await;

        if let Some(entry) = cache.as_ref() {
            if entry.is_fresh(Instant::now()) {
                return Ok(Arc::clone(&entry.appliances));
            }
        }

        let access = self.access_token().await?;
        let data: AppliancesData = graphql::execute(
            &self.http,
            &self.config.api_url,
            &access,
            &graphql::appliances_query(),
        )
        .await?;

        let appliances: Arc<Vec<Appliance>> = Arc::new(
            data.owner
                .appliances
                .into_iter()
                .map(Appliance::from_raw)
                .collect(),
        );

        tracing::debug!(appliance_count = appliances.len(), "appliance cache refreshed");
        *cache = Some(CacheEntry::new(Arc::clone(&appliances), Instant::now()));
        Ok(appliances)
    }

    /// Fetches a single appliance by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is absent from the owner's set, plus
    /// the failure modes of [`get_appliances`](Self::get_appliances).
    pub async fn get_appliance(&self, id: &str) -> Result<Appliance, Error> {
        let appliances = self.get_appliances().await?;
        appliances
            .iter()
            .find(|appliance| appliance.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Puts a room back into automatic ("Automagic") mode.
    ///
    /// Invalidates the appliance cache on success so the next read reflects
    /// the new mode.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_profile`](Self::get_profile).
    pub async fn set_automagic_mode(&self, room_id: i64) -> Result<(), Error> {
        let access = self.access_token().await?;
        graphql::execute::<serde_json::Value>(
            &self.http,
            &self.config.api_url,
            &access,
            &graphql::automagic_mode_mutation(room_id),
        )
        .await?;

        tracing::info!(room_id, "room set to automagic mode");
        self.invalidate_cache().await;
        Ok(())
    }

    /// Pins a room's fan to a manual speed.
    ///
    /// The requested speed is quantized to the device's control granularity
    /// (nearest multiple of 10) before sending; the quantized value is
    /// returned so the caller's state mirrors what was actually sent.
    /// Invalidates the appliance cache on success.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_profile`](Self::get_profile).
    pub async fn set_room_manual_fan_speed(
        &self,
        room_id: i64,
        fan_speed: u8,
    ) -> Result<u8, Error> {
        let fan_speed = quantize_fan_speed(fan_speed);

        let access = self.access_token().await?;
        graphql::execute::<serde_json::Value>(
            &self.http,
            &self.config.api_url,
            &access,
            &graphql::manual_mode_mutation(room_id, fan_speed),
        )
        .await?;

        tracing::info!(room_id, fan_speed, "room fan speed set");
        self.invalidate_cache().await;
        Ok(fan_speed)
    }

    async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
        tracing::debug!("appliance cache invalidated");
    }
}
