//! Health endpoint integration tests
//!
//! Tests for the health check endpoints:
//! - GET /health - Full health check with per-capability provider status
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe

use axum::http::StatusCode;
use serde_json::Value;

use conduit::providers::testing::ScriptedTransport;
use conduit::providers::TransportError;

use crate::common::{add_scripted_sms, test_server, test_state};

#[tokio::test]
async fn test_health_endpoint_returns_proper_structure() {
    let state = test_state();
    add_scripted_sms(&state, "primary", 1, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server.get("/health").await;

    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some(), "Response should have 'version' field");
    assert!(json.get("uptime_seconds").is_some());
    assert!(json.get("timestamp").is_some());

    let sms = &json["checks"]["sms"];
    assert_eq!(sms["status"], "healthy");
    assert_eq!(sms["registered"], 1);
    assert_eq!(sms["eligible"], 1);
    assert!(
        json["checks"].get("storage").is_none(),
        "Capabilities without providers are not reported"
    );
}

#[tokio::test]
async fn test_health_with_no_providers_is_healthy() {
    let server = test_server(test_state());

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_health_degraded_when_one_provider_unhealthy() {
    let state = test_state();
    add_scripted_sms(&state, "primary", 1, ScriptedTransport::healthy());
    add_scripted_sms(
        &state,
        "backup",
        2,
        ScriptedTransport::failing(TransportError::Connection("refused".into())),
    );
    for _ in 0..3 {
        state.monitor.run_health_check_now("backup").await.unwrap();
    }
    let server = test_server(state);

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["sms"]["eligible"], 1);
    assert_eq!(json["checks"]["sms"]["healthy"], 1);
}

#[tokio::test]
async fn test_unhealthy_when_capability_has_no_eligible_provider() {
    let state = test_state();
    add_scripted_sms(&state, "only", 1, ScriptedTransport::healthy());
    state.registry.set_enabled("only", false).unwrap();
    let server = test_server(state);

    let response = server.get("/health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json();
    assert_eq!(json["status"], "unhealthy");

    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_ready_endpoint() {
    let state = test_state();
    add_scripted_sms(&state, "primary", 1, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server.get("/health/ready").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_health_live_endpoint() {
    let server = test_server(test_state());

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_debug_endpoints_disabled_by_default() {
    let server = test_server(test_state());

    let response = server.get("/debug/config").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "DEBUG_DISABLED");
}
