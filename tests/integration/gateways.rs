//! HTTP transport tests against mock gateways
//!
//! Providers registered through the admin API with real webhook settings,
//! exercised end to end over HTTP.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{gateway_mocks, message_body, sms_provider, test_server, test_state};

#[tokio::test]
async fn test_gateway_outage_fails_over_to_second_gateway() {
    let down = MockServer::start().await;
    let up = MockServer::start().await;
    gateway_mocks::mock_failing_gateway(&down, 503).await;
    gateway_mocks::mock_accepting_gateway(&up, "msg_123").await;

    let server = test_server(test_state());
    for provider in [
        sms_provider("down", 1, &down.uri()),
        sms_provider("up", 2, &up.uri()),
    ] {
        server
            .post("/v1/providers")
            .json(&provider)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .post("/v1/sms/send")
        .json(&message_body("Your order shipped"))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["providerId"], "up");
    assert_eq!(json["reference"], "msg_123");
    assert_eq!(json["cost"], 0.02);
    assert_eq!(json["attemptedProviderIds"], json!(["down", "up"]));
    assert!(json["attempts"][0]["error"]
        .as_str()
        .unwrap()
        .contains("503"));

    let stats: Value = server.get("/v1/stats/sms").await.json();
    assert_eq!(stats["requests"]["failovers"], 1);
}

#[tokio::test]
async fn test_gateway_receives_idempotency_key_and_payload() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("Idempotency-Key", "welcome-7"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&gateway)
        .await;

    let state = test_state();
    state
        .registry
        .register(sms_provider("gw", 1, &gateway.uri()))
        .unwrap();
    let server = test_server(state);

    let response = server
        .post("/v1/sms/send")
        .add_header(
            HeaderName::from_static("idempotency-key"),
            HeaderValue::from_static("welcome-7"),
        )
        .json(&message_body("Welcome aboard"))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    // No acknowledgement body, so the configured per-message cost applies
    assert_eq!(json["cost"], 0.01);

    let received = gateway.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["to"], "+15551234567");
    assert_eq!(body["body"], "Welcome aboard");
}

#[tokio::test]
async fn test_gateway_rejection_is_request_invalid() {
    let gateway = MockServer::start().await;
    let backup = MockServer::start().await;
    gateway_mocks::mock_failing_gateway(&gateway, 400).await;
    gateway_mocks::mock_accepting_gateway(&backup, "never").await;

    let state = test_state();
    state
        .registry
        .register(sms_provider("gw", 1, &gateway.uri()))
        .unwrap();
    state
        .registry
        .register(sms_provider("backup", 2, &backup.uri()))
        .unwrap();
    let server = test_server(state);

    let response = server.post("/v1/sms/send").json(&message_body("hi")).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(backup.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_gateway_is_provider_failure() {
    let up = MockServer::start().await;
    gateway_mocks::mock_accepting_gateway(&up, "msg_9").await;

    let state = test_state();
    // Nothing listens on port 9 of localhost
    state
        .registry
        .register(sms_provider("dead", 1, "http://127.0.0.1:9"))
        .unwrap();
    state
        .registry
        .register(sms_provider("up", 2, &up.uri()))
        .unwrap();
    let server = test_server(state.clone());

    let json: Value = server
        .post("/v1/sms/send")
        .json(&message_body("hi"))
        .await
        .json();

    assert_eq!(json["providerId"], "up");
    assert_eq!(state.registry.get("dead").unwrap().usage.total_errors, 1);
    assert_eq!(
        state.registry.get("dead").unwrap().health.consecutive_failures,
        1
    );
}
