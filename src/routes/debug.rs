//! Debug endpoints for development
//!
//! These endpoints are only available when CONDUIT_DEBUG=true.
//! They expose runtime configuration and full provider records with
//! credentials redacted.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{
    providers::{ProviderConfig, ProviderSettings},
    AppState,
};

const REDACTED: &str = "***";

/// Config response (non-sensitive)
#[derive(Serialize)]
pub struct ConfigInfo {
    pub providers_file: Option<String>,
    pub health_interval_seconds: u64,
    pub probe_timeout_ms: u64,
    pub failure_threshold: u32,
    pub attempt_timeout_ms: u64,
    pub max_attempts: Option<usize>,
    pub registered_providers: usize,
    pub debug_enabled: bool,
}

/// GET /debug/config - Return non-sensitive configuration
pub async fn config_info(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !state.config.debug_enabled {
        return Err(debug_disabled_error());
    }

    let config = &state.config;
    let response = ConfigInfo {
        providers_file: config
            .providers_file
            .as_ref()
            .map(|path| path.display().to_string()),
        health_interval_seconds: config.health_interval_seconds,
        probe_timeout_ms: config.probe_timeout_ms,
        failure_threshold: config.failure_threshold,
        attempt_timeout_ms: config.attempt_timeout_ms,
        max_attempts: config.max_attempts,
        registered_providers: state.registry.len(),
        debug_enabled: config.debug_enabled,
    };

    Ok(Json(response))
}

/// GET /debug/providers - Full provider records, credentials redacted
pub async fn provider_configs(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !state.config.debug_enabled {
        return Err(debug_disabled_error());
    }

    let configs: Vec<ProviderConfig> = state
        .registry
        .configs()
        .into_iter()
        .map(redact)
        .collect();

    Ok(Json(configs))
}

fn redact(mut config: ProviderConfig) -> ProviderConfig {
    match &mut config.settings {
        ProviderSettings::SmsWebhook { api_key, .. }
        | ProviderSettings::ObjectStore { api_key, .. } => *api_key = REDACTED.to_string(),
        ProviderSettings::LocalDisk { .. } => {}
    }
    config
}

/// Helper to return a consistent 404 error when debug is disabled
fn debug_disabled_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": {
                "code": "DEBUG_DISABLED",
                "message": "Debug endpoints are disabled. Set CONDUIT_DEBUG=true to enable."
            }
        })),
    )
}
