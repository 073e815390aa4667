// Integration tests for `QueryApiClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gekkoly_api::{ApiError, Credentials, QueryApiClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn local_credentials() -> Credentials {
    Credentials::Local {
        username: "user".into(),
        password: SecretString::from("secret"),
    }
}

async fn setup() -> (MockServer, QueryApiClient) {
    let server = MockServer::start().await;
    let url = server.uri().parse().expect("mock server URL");
    let client = QueryApiClient::new(url, local_credentials(), &TransportConfig::default())
        .expect("client construction");
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn fetch_tree_carries_credentials_and_returns_json() {
    let (server, client) = setup().await;

    let body = json!({
        "lights": { "item0": { "name": "Kitchen" } },
        "blinds": { "item1": { "name": "Living Room" } },
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/var/"))
        .and(query_param("username", "user"))
        .and(query_param("password", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let tree = client.fetch_tree().await.expect("tree fetch");
    assert_eq!(tree["lights"]["item0"]["name"], "Kitchen");
}

#[tokio::test]
async fn fetch_status_returns_snapshot_json() {
    let (server, client) = setup().await;

    let body = json!({
        "lights": { "item0": { "sumstate": { "value": "1;50;0" } } }
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/var/status"))
        .and(query_param("username", "user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let snapshot = client.fetch_status().await.expect("status fetch");
    assert_eq!(snapshot["lights"]["item0"]["sumstate"]["value"], "1;50;0");
}

#[tokio::test]
async fn send_command_hits_scmd_endpoint_with_value() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/var/lights/item0/scmd/set"))
        .and(query_param("value", "D75"))
        .and(query_param("username", "user"))
        .and(query_param("password", "secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send_command("lights", "item0", "D75")
        .await
        .expect("command");
}

#[tokio::test]
async fn cloud_credentials_carry_key_and_gekkoid() {
    let server = MockServer::start().await;
    let creds = Credentials::Cloud {
        username: "user".into(),
        key: SecretString::from("cloud-key"),
        gekko_id: "GEKKO-01".into(),
    };
    let client = QueryApiClient::new(
        server.uri().parse().expect("mock server URL"),
        creds,
        &TransportConfig::default(),
    )
    .expect("client construction");

    Mock::given(method("GET"))
        .and(path("/api/v1/var/status"))
        .and(query_param("key", "cloud-key"))
        .and(query_param("gekkoid", "GEKKO-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.fetch_status().await.expect("status fetch");
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn non_200_status_maps_to_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let result = client.fetch_status().await;
    match result {
        Err(ApiError::Status { status }) => assert_eq!(status, 410),
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_preserves_raw_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/var/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json {"))
        .mount(&server)
        .await;

    let result = client.fetch_tree().await;
    match result {
        Err(ApiError::Deserialization { body, .. }) => assert_eq!(body, "not json {"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn command_failure_surfaces_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/var/loads/item2/scmd/set"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client.send_command("loads", "item2", "1").await;
    assert!(matches!(result, Err(ApiError::Status { status: 403 })));
}
