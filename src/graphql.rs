use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::appliance::{ApplianceState, Room, SensorKind};
use crate::error::Error;

/// Target AQI sent with every manual-mode command.
const TARGET_AQI: u8 = 10;

/// Executes a GraphQL document with a bearer token.
///
/// Non-2xx responses fail with [`Error::Transport`]; a GraphQL `errors`
/// payload inside a 2xx response fails with [`Error::Protocol`]. There is no
/// retry-on-401: the half-life expiry policy keeps tokens valid for the
/// duration of any single request.
pub(crate) async fn execute<T: DeserializeOwned>(
    http: &reqwest::Client,
    api_url: &Url,
    access_token: &str,
    document: &str,
) -> Result<T, Error> {
    let response = http
        .post(api_url.clone())
        .bearer_auth(access_token)
        .json(&serde_json::json!({ "query": document }))
        .send()
        .await?
        .error_for_status()?;

    let envelope: Envelope<T> = response.json().await?;

    if !envelope.errors.is_empty() {
        let detail = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Protocol(detail));
    }

    envelope
        .data
        .ok_or_else(|| Error::Protocol("response carried no data".into()))
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    message: String,
}

// ── Documents ──────────────────────────────────────────────────────

pub(crate) const PROFILE_QUERY: &str =
    "query { owner { profile { firstName, lastName, email } } }";

pub(crate) fn appliances_query() -> String {
    let kinds = SensorKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "query {{ owner {{ appliances {{ id, name, room {{ id, kind }}, \
         state {{ actualMode }}, sensors(kinds: [{kinds}]) {{ kind, \
         latest(precision: {{unit: Minute, value: 1}}) {{ instant, value }} }} }} }} }}"
    )
}

pub(crate) fn automagic_mode_mutation(room_id: i64) -> String {
    format!("mutation {{ applyRoomAutomagicMode(roomId: {room_id}) {{ id }} }}")
}

pub(crate) fn manual_mode_mutation(room_id: i64, fan_speed: u8) -> String {
    format!(
        "mutation {{ applyRoomManualMode(roomId: {room_id}, targetAqi: {TARGET_AQI}, \
         fanSpeed: {fan_speed}) {{ id }} }}"
    )
}

// ── Wire types ─────────────────────────────────────────────────────

/// Account profile of the authenticated owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileData {
    pub(crate) owner: ProfileOwner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileOwner {
    pub(crate) profile: Profile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppliancesData {
    pub(crate) owner: AppliancesOwner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppliancesOwner {
    pub(crate) appliances: Vec<RawAppliance>,
}

/// Appliance as returned by the API, before reshaping.
#[derive(Debug, Deserialize)]
pub(crate) struct RawAppliance {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) room: Room,
    pub(crate) state: ApplianceState,
    #[serde(default)]
    pub(crate) sensors: Vec<RawSensor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSensor {
    pub(crate) kind: SensorKind,
    pub(crate) latest: Option<RawReading>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReading {
    pub(crate) value: f64,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_appliances_query_lists_every_sensor_kind() {
        let document = appliances_query();
        for kind in SensorKind::ALL {
            assert!(
                document.contains(kind.as_str()),
                "missing {} in appliance query",
                kind.as_str()
            );
        }
        assert!(document.contains("precision: {unit: Minute, value: 1}"));
    }

    #[test]
    fn test_manual_mode_mutation_carries_fixed_target_aqi() {
        let document = manual_mode_mutation(42, 80);
        assert!(document.contains("roomId: 42"));
        assert!(document.contains("targetAqi: 10"));
        assert!(document.contains("fanSpeed: 80"));
    }

    #[tokio::test]
    async fn test_execute_decodes_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("Authorization", "Bearer token-1"))
            .and(body_string_contains("owner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "owner": {
                        "profile": {
                            "firstName": "Ada",
                            "lastName": "Lovelace",
                            "email": "ada@example.com"
                        }
                    }
                }
            })))
            .mount(&mock_server)
            .await;

        let api_url: Url = format!("{}/graphql", mock_server.uri()).parse().unwrap();
        let data: ProfileData =
            execute(&reqwest::Client::new(), &api_url, "token-1", PROFILE_QUERY)
                .await
                .expect("should decode");

        assert_eq!(data.owner.profile.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_execute_surfaces_graphql_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [
                    { "message": "room not found" },
                    { "message": "permission denied" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let api_url: Url = format!("{}/graphql", mock_server.uri()).parse().unwrap();
        let result: Result<ProfileData, Error> =
            execute(&reqwest::Client::new(), &api_url, "token-1", PROFILE_QUERY).await;

        match result {
            Err(Error::Protocol(detail)) => {
                assert!(detail.contains("room not found"));
                assert!(detail.contains("permission denied"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_maps_http_failure_to_transport() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let api_url: Url = format!("{}/graphql", mock_server.uri()).parse().unwrap();
        let result: Result<ProfileData, Error> =
            execute(&reqwest::Client::new(), &api_url, "token-1", PROFILE_QUERY).await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
