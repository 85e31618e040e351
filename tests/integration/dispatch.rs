//! Dispatch endpoint tests
//!
//! Message sends and file stores through the HTTP surface, covering
//! failover, error mapping, idempotency keys and usage statistics.

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use conduit::providers::testing::{Scripted, ScriptedTransport};
use conduit::providers::TransportError;

use crate::common::{
    add_scripted_sms, disk_provider, message_body, test_server, test_state,
};

fn unavailable() -> TransportError {
    TransportError::Upstream {
        status: 503,
        message: "unavailable".into(),
    }
}

fn idempotency_header() -> HeaderName {
    HeaderName::from_static("idempotency-key")
}

#[tokio::test]
async fn test_timeout_fails_over_to_backup() {
    let state = test_state();
    let primary = add_scripted_sms(&state, "primary", 1, ScriptedTransport::healthy());
    primary.push_invoke(Scripted::Hang(Duration::from_secs(5)));
    add_scripted_sms(&state, "backup", 2, ScriptedTransport::costing(0.03));
    let server = test_server(state.clone());

    let response = server
        .post("/v1/sms/send")
        .json(&message_body("Your code is 1234"))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["providerId"], "backup");
    assert_eq!(json["succeeded"], true);
    assert_eq!(json["attemptedProviderIds"], json!(["primary", "backup"]));
    assert_eq!(json["attempts"][0]["errorClass"], "provider_local");

    let primary_usage = state.registry.get("primary").unwrap().usage;
    let backup_usage = state.registry.get("backup").unwrap().usage;
    assert_eq!(primary_usage.total_errors, 1);
    assert_eq!(backup_usage.total_succeeded, 1);
}

#[tokio::test]
async fn test_exhausted_failover_returns_bad_gateway_with_trail() {
    let state = test_state();
    for (id, priority) in [("a", 1), ("b", 2), ("c", 3)] {
        add_scripted_sms(&state, id, priority, ScriptedTransport::failing(unavailable()));
    }
    let server = test_server(state.clone());

    let response = server.post("/v1/sms/send").json(&message_body("hi")).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "EXHAUSTED_FAILOVER");
    assert_eq!(
        json["error"]["details"]["attemptedProviderIds"],
        json!(["a", "b", "c"])
    );
    assert_eq!(json["error"]["details"]["capability"], "sms");
    for id in ["a", "b", "c"] {
        assert_eq!(state.registry.get(id).unwrap().usage.total_errors, 1);
    }
}

#[tokio::test]
async fn test_repeated_failures_degrade_provider() {
    let state = test_state();
    let flaky = add_scripted_sms(&state, "flaky", 1, ScriptedTransport::failing(unavailable()));
    add_scripted_sms(&state, "steady", 2, ScriptedTransport::healthy());
    let server = test_server(state.clone());

    for _ in 0..3 {
        server
            .post("/v1/sms/send")
            .json(&message_body("hi"))
            .await
            .assert_status_ok();
    }
    assert_eq!(flaky.invoke_count(), 3);
    assert!(!state.registry.get("flaky").unwrap().health.is_healthy);

    // The degraded provider is skipped without waiting for a probe
    let json: Value = server
        .post("/v1/sms/send")
        .json(&message_body("hi"))
        .await
        .json();
    assert_eq!(json["attemptedProviderIds"], json!(["steady"]));
    assert_eq!(flaky.invoke_count(), 3);
}

#[tokio::test]
async fn test_provider_rejection_is_not_retried() {
    let state = test_state();
    add_scripted_sms(
        &state,
        "strict",
        1,
        ScriptedTransport::failing(TransportError::Rejected {
            status: 400,
            message: "unroutable number".into(),
        }),
    );
    let backup = add_scripted_sms(&state, "backup", 2, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server.post("/v1/sms/send").json(&message_body("hi")).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "REQUEST_INVALID");
    assert_eq!(json["error"]["details"]["providerId"], "strict");
    assert_eq!(json["error"]["details"]["attemptedProviderIds"], json!(["strict"]));
    assert_eq!(backup.invoke_count(), 0);
}

#[tokio::test]
async fn test_invalid_recipient_rejected_before_dispatch() {
    let state = test_state();
    let transport = add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    let server = test_server(state);

    let response = server
        .post("/v1/sms/send")
        .json(&json!({ "to": "call me maybe", "body": "hi" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = response.json();
    assert_eq!(json["error"]["details"]["attempts"], json!([]));
    assert_eq!(transport.invoke_count(), 0);
}

#[tokio::test]
async fn test_no_eligible_provider_is_service_unavailable() {
    let state = test_state();
    add_scripted_sms(&state, "a", 1, ScriptedTransport::healthy());
    state.registry.set_active("a", false).unwrap();
    let server = test_server(state);

    let response = server.post("/v1/sms/send").json(&message_body("hi")).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "NO_HEALTHY_PROVIDER");
}

#[tokio::test]
async fn test_idempotency_key_forwarded_to_every_attempt() {
    let state = test_state();
    let first = add_scripted_sms(&state, "first", 1, ScriptedTransport::failing(unavailable()));
    let second = add_scripted_sms(&state, "second", 2, ScriptedTransport::healthy());
    let server = test_server(state);

    server
        .post("/v1/sms/send")
        .add_header(idempotency_header(), HeaderValue::from_static("order-42"))
        .json(&message_body("shipped"))
        .await
        .assert_status_ok();

    assert_eq!(first.seen_keys(), vec!["order-42"]);
    assert_eq!(second.seen_keys(), vec!["order-42"]);
}

#[tokio::test]
async fn test_store_file_on_local_disk() {
    let state = test_state();
    let dir = tempfile::tempdir().unwrap();
    state
        .registry
        .register(disk_provider("disk", 1, dir.path()))
        .unwrap();
    let server = test_server(state);

    let response = server
        .put("/v1/files/reports/2024/summary.txt")
        .add_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .bytes("quarterly numbers".as_bytes().to_vec().into())
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["providerId"], "disk");
    let written = std::fs::read_to_string(dir.path().join("reports/2024/summary.txt")).unwrap();
    assert_eq!(written, "quarterly numbers");
}

#[tokio::test]
async fn test_store_file_fails_over_between_disks() {
    let state = test_state();
    let good = tempfile::tempdir().unwrap();
    // A regular file where the root directory should be
    let broken_root = tempfile::NamedTempFile::new().unwrap();
    state
        .registry
        .register(disk_provider("broken", 1, broken_root.path()))
        .unwrap();
    state
        .registry
        .register(disk_provider("good", 2, good.path()))
        .unwrap();
    let server = test_server(state);

    let response = server
        .put("/v1/files/notes.txt")
        .bytes("hello".as_bytes().to_vec().into())
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["attemptedProviderIds"], json!(["broken", "good"]));
    assert!(good.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_empty_file_rejected() {
    let state = test_state();
    let dir = tempfile::tempdir().unwrap();
    state
        .registry
        .register(disk_provider("disk", 1, dir.path()))
        .unwrap();
    let server = test_server(state);

    let response = server
        .put("/v1/files/empty.txt")
        .bytes(Vec::new().into())
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_stats_report_success_rate_per_provider() {
    let state = test_state();
    let flaky = add_scripted_sms(&state, "flaky", 1, ScriptedTransport::healthy());
    flaky.push_invoke(Scripted::Fail(unavailable()));
    add_scripted_sms(&state, "backup", 2, ScriptedTransport::healthy());
    add_scripted_sms(&state, "idle", 3, ScriptedTransport::healthy());
    let server = test_server(state);

    for _ in 0..2 {
        server
            .post("/v1/sms/send")
            .json(&message_body("hi"))
            .await
            .assert_status_ok();
    }

    let json: Value = server.get("/v1/stats/sms").await.json();
    let providers = &json["providers"];
    assert_eq!(providers[0]["providerId"], "flaky");
    assert_eq!(providers[0]["successRate"], 0.5);
    assert_eq!(providers[1]["successRate"], 1.0);
    assert_eq!(providers[2]["successRate"], Value::Null);
}

#[tokio::test]
async fn test_stats_reflect_dispatches() {
    let state = test_state();
    add_scripted_sms(&state, "a", 1, ScriptedTransport::costing(0.05));
    let server = test_server(state);

    for _ in 0..2 {
        server
            .post("/v1/sms/send")
            .json(&message_body("hi"))
            .await
            .assert_status_ok();
    }
    server
        .post("/v1/sms/send")
        .json(&json!({ "to": "bad", "body": "hi" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server.get("/v1/stats/sms").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["requests"]["totalRequests"], 3);
    assert_eq!(json["requests"]["succeeded"], 2);
    assert_eq!(json["requests"]["requestInvalid"], 1);
    assert_eq!(json["providers"][0]["providerId"], "a");
    assert_eq!(json["providers"][0]["usage"]["totalSucceeded"], 2);
    assert_eq!(json["providers"][0]["successRate"], 1.0);
    let total_cost = json["totalCost"].as_f64().unwrap();
    assert!((total_cost - 0.10).abs() < 1e-9);
}
