//! Provider administration endpoints
//!
//! Registration, partial updates, the enable/active toggles and on-demand
//! health checks. Every read returns a point-in-time snapshot.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    health::HealthState,
    providers::{CapabilityType, ProviderConfig, ProviderUpdate},
    registry::ProviderSnapshot,
    AppState,
};

/// Query parameters for the provider list
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub capability: Option<String>,
    /// Only return providers eligible for dispatch
    #[serde(default)]
    pub eligible: bool,
}

/// Provider list response
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub data: Vec<ProviderSnapshot>,
}

/// Body of the toggle endpoints
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub value: bool,
}

/// Toggle result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub changed: bool,
    pub provider: ProviderSnapshot,
}

/// On-demand health check result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub provider_id: String,
    pub health: HealthState,
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

/// GET /v1/providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ProvidersResponse>> {
    let data = match query.capability.as_deref() {
        Some(raw) => {
            let capability: CapabilityType = raw.parse()?;
            if query.eligible {
                state.registry.eligible_candidates(capability)
            } else {
                state.registry.snapshot(capability)
            }
        }
        None if query.eligible => CapabilityType::all()
            .into_iter()
            .flat_map(|capability| state.registry.eligible_candidates(capability))
            .collect(),
        None => state.registry.snapshot_all(),
    };

    Ok(Json(ProvidersResponse { data }))
}

/// POST /v1/providers
pub async fn register_provider(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ProviderSnapshot>)> {
    let config: ProviderConfig = parse_body(&body)?;
    let snapshot = state.registry.register(config)?;

    info!(
        provider_id = %snapshot.id,
        capability = %snapshot.capability,
        kind = %snapshot.kind,
        "Provider registered via admin API"
    );

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /v1/providers/:id
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ProviderSnapshot>> {
    Ok(Json(state.registry.get(&id)?))
}

/// PATCH /v1/providers/:id
pub async fn update_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ProviderSnapshot>> {
    let update: ProviderUpdate = parse_body(&body)?;
    Ok(Json(state.registry.update(&id, update)?))
}

/// DELETE /v1/providers/:id
pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ProviderSnapshot>> {
    let removed = state.registry.deregister(&id)?;
    info!(provider_id = %id, "Provider removed via admin API");
    Ok(Json(removed))
}

/// PUT /v1/providers/:id/enabled
pub async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ToggleResponse>> {
    let toggle: ToggleRequest = parse_body(&body)?;
    let changed = state.registry.set_enabled(&id, toggle.value)?;
    Ok(Json(ToggleResponse {
        changed,
        provider: state.registry.get(&id)?,
    }))
}

/// PUT /v1/providers/:id/active
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ToggleResponse>> {
    let toggle: ToggleRequest = parse_body(&body)?;
    let changed = state.registry.set_active(&id, toggle.value)?;
    Ok(Json(ToggleResponse {
        changed,
        provider: state.registry.get(&id)?,
    }))
}

/// POST /v1/providers/:id/health-check
pub async fn run_health_check(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<HealthCheckResponse>> {
    let health = state.monitor.run_health_check_now(&id).await?;
    Ok(Json(HealthCheckResponse {
        provider_id: id,
        health,
    }))
}
