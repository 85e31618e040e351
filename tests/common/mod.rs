//! Common test utilities for Conduit
//!
//! Shared fixtures, provider records, mock gateways and helper functions used
//! across the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use conduit::providers::testing::ScriptedTransport;
use conduit::providers::{CapabilityType, ProviderConfig, ProviderSettings};
use conduit::{routes, AppState, Config};

/// Test configuration constants
pub mod constants {
    /// API key configured on mock gateways
    pub const TEST_API_KEY: &str = "test-gateway-key";
    /// A recipient that passes validation
    pub const TEST_RECIPIENT: &str = "+15551234567";
    /// Short per-attempt timeout so failover tests run quickly
    pub const TEST_ATTEMPT_TIMEOUT_MS: u64 = 200;
}

/// Config with short timeouts and no providers file
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        attempt_timeout_ms: constants::TEST_ATTEMPT_TIMEOUT_MS,
        probe_timeout_ms: 200,
        ..Config::default()
    }
}

/// Application state with an empty registry
pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new_for_testing(test_config()))
}

/// Test server over the full router
pub fn test_server(state: Arc<AppState>) -> TestServer {
    TestServer::new(routes::create_router(state)).expect("Failed to create test server")
}

/// SMS provider record pointing at `base_url`
pub fn sms_provider(id: &str, priority: i32, base_url: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: format!("{} gateway", id),
        capability: CapabilityType::Sms,
        priority,
        is_enabled: true,
        is_active: true,
        settings: ProviderSettings::SmsWebhook {
            base_url: base_url.to_string(),
            api_key: constants::TEST_API_KEY.to_string(),
            sender_id: None,
            cost_per_message: 0.01,
        },
    }
}

/// Local disk storage provider record
pub fn disk_provider(id: &str, priority: i32, root: &Path) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: format!("{} disk", id),
        capability: CapabilityType::Storage,
        priority,
        is_enabled: true,
        is_active: true,
        settings: ProviderSettings::LocalDisk {
            root_dir: root.to_path_buf(),
            cost_per_gb: 0.0,
        },
    }
}

/// Register an SMS provider backed by a scripted transport
pub fn add_scripted_sms(
    state: &AppState,
    id: &str,
    priority: i32,
    transport: ScriptedTransport,
) -> Arc<ScriptedTransport> {
    let transport = Arc::new(transport);
    state
        .registry
        .register_with_transport(
            sms_provider(id, priority, "https://unused.example.com"),
            transport.clone(),
        )
        .expect("Failed to register scripted provider");
    transport
}

/// JSON body for a valid message send
pub fn message_body(text: &str) -> Value {
    json!({ "to": constants::TEST_RECIPIENT, "body": text })
}

/// Mock SMS gateway responses
pub mod gateway_mocks {
    use super::*;

    /// Gateway that accepts every message
    pub async fn mock_accepting_gateway(server: &MockServer, message_id: &str) {
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header(
                "Authorization",
                format!("Bearer {}", constants::TEST_API_KEY).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": message_id,
                "cost": 0.02
            })))
            .mount(server)
            .await;
    }

    /// Gateway that fails every message with `status`
    pub async fn mock_failing_gateway(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "gateway unavailable"
            })))
            .mount(server)
            .await;
    }

    /// Gateway health endpoint
    pub async fn mock_gateway_health(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }
}
