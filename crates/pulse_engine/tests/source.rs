use std::time::Duration;

use pretty_assertions::assert_eq;
use pulse_core::{PollFailure, StatusPayload};
use pulse_engine::{ReqwestStatusSource, SourceSettings, StatusSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer, route: &str) -> ReqwestStatusSource {
    source_with(server, route, SourceSettings::default())
}

fn source_with(server: &MockServer, route: &str, settings: SourceSettings) -> ReqwestStatusSource {
    ReqwestStatusSource::new(SourceSettings {
        endpoint: format!("{}{}", server.uri(), route),
        ..settings
    })
    .expect("valid endpoint")
}

#[tokio::test]
async fn source_parses_status_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"online":true,"guilds":42,"permitted_users":7,"latency":12}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let payload = source_for(&server, "/api/status").fetch().await.unwrap();
    assert_eq!(
        payload,
        StatusPayload {
            online: Some(true),
            guilds: Some(42),
            permitted_users: Some(7),
            latency: Some(12),
        }
    );
}

#[tokio::test]
async fn source_accepts_partial_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let payload = source_for(&server, "/api/status").fetch().await.unwrap();
    assert_eq!(payload, StatusPayload::default());
}

#[tokio::test]
async fn source_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source_for(&server, "/api/status").fetch().await.unwrap_err();
    assert_eq!(err, PollFailure::HttpStatus(503));
}

#[tokio::test]
async fn source_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>maintenance</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let err = source_for(&server, "/api/status").fetch().await.unwrap_err();
    assert!(matches!(err, PollFailure::Payload(_)), "got {err:?}");
}

#[tokio::test]
async fn source_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let settings = SourceSettings {
        request_timeout: Duration::from_millis(50),
        ..SourceSettings::default()
    };
    let err = source_with(&server, "/slow", settings)
        .fetch()
        .await
        .unwrap_err();
    assert_eq!(err, PollFailure::Timeout);
}

#[tokio::test]
async fn source_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/json")
                .set_body_string(format!(r#"{{"pad":"{}"}}"#, "x".repeat(64))),
        )
        .mount(&server)
        .await;

    let settings = SourceSettings {
        max_bytes: 32,
        ..SourceSettings::default()
    };
    let err = source_with(&server, "/large", settings)
        .fetch()
        .await
        .unwrap_err();
    assert_eq!(err, PollFailure::TooLarge { max_bytes: 32 });
}

#[test]
fn invalid_endpoint_is_rejected_up_front() {
    let err = ReqwestStatusSource::new(SourceSettings {
        endpoint: "not a url".to_string(),
        ..SourceSettings::default()
    })
    .unwrap_err();
    assert!(matches!(err, PollFailure::InvalidEndpoint(_)));
}
