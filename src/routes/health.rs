//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with per-capability provider status
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe
//!
//! The service is healthy when every capability that has providers
//! registered has at least one eligible provider, degraded when some do,
//! and unhealthy when a registered capability has none.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{providers::CapabilityType, AppState};

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Provider availability for one capability
#[derive(Debug, Serialize)]
pub struct CapabilityCheck {
    pub status: HealthStatus,
    pub registered: usize,
    pub eligible: usize,
    pub healthy: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub checks: BTreeMap<CapabilityType, CapabilityCheck>,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

fn check_capability(state: &AppState, capability: CapabilityType) -> Option<CapabilityCheck> {
    let providers = state.registry.snapshot(capability);
    if providers.is_empty() {
        return None;
    }

    let eligible = providers.iter().filter(|p| p.is_eligible).count();
    let healthy = providers.iter().filter(|p| p.health.is_healthy).count();
    let status = if eligible == 0 {
        HealthStatus::Unhealthy
    } else if eligible < providers.iter().filter(|p| p.is_enabled).count() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    Some(CapabilityCheck {
        status,
        registered: providers.len(),
        eligible,
        healthy,
    })
}

fn overall(checks: &BTreeMap<CapabilityType, CapabilityCheck>) -> HealthStatus {
    if checks
        .values()
        .any(|check| check.status == HealthStatus::Unhealthy)
    {
        HealthStatus::Unhealthy
    } else if checks
        .values()
        .any(|check| check.status == HealthStatus::Degraded)
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

fn collect_checks(state: &AppState) -> BTreeMap<CapabilityType, CapabilityCheck> {
    CapabilityType::all()
        .iter()
        .filter_map(|&capability| {
            check_capability(state, capability).map(|check| (capability, check))
        })
        .collect()
}

/// Full health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let checks = collect_checks(&state);
    let overall_status = overall(&checks);

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Readiness probe endpoint
///
/// Returns 503 while any registered capability has no eligible provider.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    if overall(&collect_checks(&state)) == HealthStatus::Unhealthy {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
///
/// Returns 200 OK if the application is alive.
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
