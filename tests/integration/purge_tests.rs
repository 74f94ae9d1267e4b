use cache_warmer::config::PurgeConfig;
use cache_warmer::purge::PurgeClient;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PURGE_PATH: &str = "/client/v4/zones/zone-abc/purge_cache";

fn purge_client(server: &MockServer) -> PurgeClient {
    let config = PurgeConfig {
        zone_id: "zone-abc".to_string(),
        token_env: "CF_API_TOKEN".to_string(),
        api_base: format!("{}/client/v4", server.uri()),
        timeout_secs: 5,
    };
    PurgeClient::new(&config, "secret-token".to_string()).unwrap()
}

#[tokio::test]
async fn test_purge_succeeds_first_try() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PURGE_PATH))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({ "purge_everything": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"success":true,"errors":[],"result":{"id":"zone-abc"}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = purge_client(&server).purge_everything().await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.status, Some(200));
}

#[tokio::test]
async fn test_purge_retries_once_after_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PURGE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PURGE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let outcome = purge_client(&server).purge_everything().await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn test_purge_gives_up_after_second_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PURGE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"success":false}"#))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = purge_client(&server).purge_everything().await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.status, Some(403));
}
