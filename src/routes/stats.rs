//! Usage statistics endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    providers::CapabilityType,
    usage::{RequestStats, UsageStats},
    AppState,
};

/// Per-provider usage line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    pub provider_id: String,
    /// Share of attempts that succeeded; null before the first attempt
    pub success_rate: Option<f64>,
    pub usage: UsageStats,
}

/// Request-level counters plus per-provider usage for one capability
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub capability: CapabilityType,
    pub requests: RequestStats,
    pub total_cost: f64,
    pub providers: Vec<ProviderUsage>,
}

/// GET /v1/stats/:capability
pub async fn capability_stats(
    State(state): State<Arc<AppState>>,
    Path(capability): Path<String>,
) -> AppResult<Json<StatsResponse>> {
    let capability: CapabilityType = capability.parse()?;

    let providers: Vec<ProviderUsage> = state
        .registry
        .snapshot(capability)
        .into_iter()
        .map(|snapshot| ProviderUsage {
            provider_id: snapshot.id,
            success_rate: snapshot.usage.success_rate(),
            usage: snapshot.usage,
        })
        .collect();
    let total_cost = providers.iter().map(|p| p.usage.total_cost).sum();

    Ok(Json(StatsResponse {
        capability,
        requests: state.accountant.request_stats(capability),
        total_cost,
        providers,
    }))
}
