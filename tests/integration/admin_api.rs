//! Provider administration endpoint tests
//!
//! Registration, updates, toggles, removal and on-demand health checks
//! through the HTTP surface.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::MockServer;

use conduit::providers::testing::ScriptedTransport;

use crate::common::{
    add_scripted_sms, gateway_mocks, sms_provider, test_server, test_state,
};

fn ids(json: &Value) -> Vec<String> {
    json["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_register_and_get_provider() {
    let server = test_server(test_state());

    let response = server
        .post("/v1/providers")
        .json(&sms_provider("twilio", 1, "https://sms.example.com"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["id"], "twilio");
    assert_eq!(created["kind"], "sms_webhook");
    assert_eq!(created["isEligible"], true);
    assert_eq!(created["health"]["isHealthy"], true);
    assert_eq!(created["usage"]["totalAttempted"], 0);
    assert!(
        created.get("settings").is_none(),
        "Snapshots must not expose credentials"
    );

    let response = server.get("/v1/providers/twilio").await;
    response.assert_status_ok();
    let fetched: Value = response.json();
    assert_eq!(fetched["name"], "twilio gateway");
}

#[tokio::test]
async fn test_list_orders_by_priority_and_filters() {
    let state = test_state();
    add_scripted_sms(&state, "c", 3, ScriptedTransport::healthy());
    add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    add_scripted_sms(&state, "b", 2, ScriptedTransport::healthy());
    state.registry.set_active("b", false).unwrap();
    let server = test_server(state);

    let all: Value = server.get("/v1/providers?capability=sms").await.json();
    assert_eq!(ids(&all), vec!["a", "b", "c"]);

    let eligible: Value = server
        .get("/v1/providers?capability=sms&eligible=true")
        .await
        .json();
    assert_eq!(ids(&eligible), vec!["a", "c"]);

    let storage: Value = server.get("/v1/providers?capability=storage").await.json();
    assert!(ids(&storage).is_empty());
}

#[tokio::test]
async fn test_unknown_capability_is_bad_request() {
    let server = test_server(test_state());

    let response = server.get("/v1/providers?capability=fax").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_register_rejects_mismatched_capability() {
    let server = test_server(test_state());
    let mut record = serde_json::to_value(sms_provider("x", 1, "https://sms.example.com")).unwrap();
    record["capability"] = json!("storage");

    let response = server.post("/v1/providers").json(&record).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "INVALID_CONFIG");
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let server = test_server(test_state());

    let response = server
        .post("/v1/providers")
        .content_type("application/json")
        .bytes("not valid json".as_bytes().to_vec().into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_reregister_same_id_other_capability_conflicts() {
    let state = test_state();
    add_scripted_sms(&state, "shared", 1, ScriptedTransport::healthy());
    let server = test_server(state);
    let dir = tempfile::tempdir().unwrap();

    let response = server
        .post("/v1/providers")
        .json(&crate::common::disk_provider("shared", 1, dir.path()))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "DUPLICATE_ID");
}

#[tokio::test]
async fn test_patch_updates_priority() {
    let state = test_state();
    add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    add_scripted_sms(&state, "b", 2, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server
        .patch("/v1/providers/b")
        .json(&json!({ "priority": 0 }))
        .await;
    response.assert_status_ok();

    let eligible: Value = server
        .get("/v1/providers?capability=sms&eligible=true")
        .await
        .json();
    assert_eq!(ids(&eligible), vec!["b", "a"]);
}

#[tokio::test]
async fn test_toggles_report_changes() {
    let state = test_state();
    add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server
        .put("/v1/providers/a/enabled")
        .json(&json!({ "value": false }))
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["changed"], true);
    assert_eq!(json["provider"]["isEnabled"], false);
    assert_eq!(json["provider"]["isActive"], false, "effective active while disabled");
    assert_eq!(json["provider"]["isEligible"], false);

    // Same value again is a no-op
    let json: Value = server
        .put("/v1/providers/a/enabled")
        .json(&json!({ "value": false }))
        .await
        .json();
    assert_eq!(json["changed"], false);

    let json: Value = server
        .put("/v1/providers/a/enabled")
        .json(&json!({ "value": true }))
        .await
        .json();
    assert_eq!(json["provider"]["isActive"], true);
    assert_eq!(json["provider"]["isEligible"], true);
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let server = test_server(test_state());

    server
        .get("/v1/providers/ghost")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .put("/v1/providers/ghost/active")
        .json(&json!({ "value": true }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post("/v1/providers/ghost/health-check")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server.delete("/v1/providers/ghost").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_provider() {
    let state = test_state();
    add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    let server = test_server(state.clone());

    server.delete("/v1/providers/a").await.assert_status_ok();

    assert!(state.registry.is_empty());
    server
        .get("/v1/providers/a")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check_endpoint_probes_gateway() {
    let gateway = MockServer::start().await;
    gateway_mocks::mock_gateway_health(&gateway, 503).await;

    let state = test_state();
    state
        .registry
        .register(sms_provider("real", 1, &gateway.uri()))
        .unwrap();
    let server = test_server(state);

    let response = server.post("/v1/providers/real/health-check").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["providerId"], "real");
    assert_eq!(json["health"]["consecutiveFailures"], 1);
    assert_eq!(json["health"]["isHealthy"], true);
    assert!(json["health"]["lastError"]
        .as_str()
        .unwrap()
        .contains("503"));
    assert!(json["health"]["lastCheckedAt"].is_string());
}
