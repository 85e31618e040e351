//! Usage accountant
//!
//! Applies per-attempt provider counters and per-request outcomes. All
//! provider counters go through the registry entry's lock, so concurrent
//! dispatches to the same provider never lose an update.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::{
    providers::CapabilityType,
    registry::ProviderRegistry,
    routes::metrics,
};

use super::{RequestOutcome, RequestStats};

/// Records usage for providers and requests
pub struct UsageAccountant {
    registry: Arc<ProviderRegistry>,
    requests: DashMap<CapabilityType, RequestStats>,
}

impl UsageAccountant {
    /// Create a new usage accountant
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            requests: DashMap::new(),
        }
    }

    /// Record a successful attempt
    pub fn record_success(&self, provider_id: &str, cost: f64) {
        match self.registry.entry(provider_id) {
            Ok(entry) => {
                entry.update_usage(|usage| usage.record_success(cost));
                metrics::record_attempt(provider_id, "success");
                debug!(provider_id = %provider_id, cost, "Recorded successful attempt");
            }
            Err(_) => debug!(
                provider_id = %provider_id,
                "Provider removed before its success could be recorded"
            ),
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&self, provider_id: &str) {
        match self.registry.entry(provider_id) {
            Ok(entry) => {
                entry.update_usage(|usage| usage.record_failure());
                metrics::record_attempt(provider_id, "failure");
                debug!(provider_id = %provider_id, "Recorded failed attempt");
            }
            Err(_) => debug!(
                provider_id = %provider_id,
                "Provider removed before its failure could be recorded"
            ),
        }
    }

    /// Record the terminal outcome of one request
    pub fn record_outcome(
        &self,
        capability: CapabilityType,
        outcome: RequestOutcome,
        attempts: usize,
        duration: Duration,
    ) {
        self.requests
            .entry(capability)
            .or_default()
            .record(outcome, attempts);
        metrics::record_dispatch(capability.as_str(), outcome.as_str(), duration.as_secs_f64());
    }

    /// Request-level counters for a capability
    pub fn request_stats(&self, capability: CapabilityType) -> RequestStats {
        self.requests
            .get(&capability)
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }
}
