use reqwest::header::LOCATION;
use reqwest::redirect;
use url::Url;
use uuid::Uuid;

use crate::config::MilaConfig;
use crate::error::Error;
use crate::pkce::PkceChallenge;

/// Performs the two-step browser-less login and returns the authorization
/// code for the given PKCE challenge.
///
/// Step 1 fetches the provider's authorize page (redirects disabled) and
/// extracts the login form's submission URL. Step 2 posts the credentials to
/// it and pulls the authorization code from the redirect. Cookies issued in
/// step 1 ride along automatically: the client built here carries a cookie
/// store scoped to this one attempt.
///
/// # Errors
///
/// [`Error::Parse`] if the login page carries no form action,
/// [`Error::Auth`] if the credential response is not a redirect carrying a
/// `code` parameter, [`Error::Transport`] on network/HTTP failure.
pub(crate) async fn login(
    config: &MilaConfig,
    email: &str,
    password: &str,
    pkce: &PkceChallenge,
) -> Result<String, Error> {
    let http = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .cookie_store(true)
        .build()?;

    let state = Uuid::new_v4().to_string();
    let mut auth_url = config.auth_url.clone();
    auth_url
        .query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &config.scope())
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("state", &state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", "S256");

    tracing::debug!("fetching login page");
    let page = http
        .get(auth_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let action = form_action(&page)?;
    let action_url = config
        .auth_url
        .join(&action)
        .map_err(|e| Error::Parse(format!("invalid form action {action:?}: {e}")))?;

    tracing::debug!("submitting credentials");
    let response = http
        .post(action_url)
        .form(&[("username", email), ("password", password)])
        .send()
        .await?
        .error_for_status()?;

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::Auth("login was not accepted (no redirect)".into()))?;

    authorization_code(location)
}

/// Extracts the login form's submission URL from the authorize page.
///
/// The page shape is scraped, not part of any stable API; keeping the
/// extraction here makes a provider markup change a one-function fix.
/// Entity references in the attribute (`&amp;`) are decoded by the HTML
/// parser.
fn form_action(html: &str) -> Result<String, Error> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("form[action]").expect("valid selector");

    document
        .select(&selector)
        .next()
        .and_then(|form| form.value().attr("action"))
        .map(str::to_owned)
        .ok_or_else(|| Error::Parse("login page carries no form action".into()))
}

/// Pulls the `code` query parameter out of the provider's redirect target.
fn authorization_code(location: &str) -> Result<String, Error> {
    let url = Url::parse(location)
        .map_err(|e| Error::Auth(format!("unparseable redirect {location:?}: {e}")))?;

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::Auth("redirect carried no authorization code".into()))
}
