//! Provider health tracking
//!
//! Health state is owned by the core. It changes in two ways: scheduled or
//! on-demand probes run by the [`HealthMonitor`], and failed dispatch attempts
//! reported by the dispatcher (fast degradation, which can mark a provider
//! unhealthy before the next probe runs).

pub mod monitor;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use monitor::HealthMonitor;

/// Configuration for health tracking
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    /// Time between scheduled probe cycles (default: 30 seconds)
    pub interval: Duration,
    /// Upper bound for a single probe (default: 5 seconds)
    pub probe_timeout: Duration,
    /// Consecutive failures before a provider is marked unhealthy (default: 3)
    pub failure_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

/// Health state of a single provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    pub is_healthy: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl Default for HealthState {
    /// Unknown providers start out healthy
    fn default() -> Self {
        Self {
            is_healthy: true,
            last_checked_at: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

impl HealthState {
    /// Apply a successful probe. Returns true if the provider recovered.
    pub(crate) fn record_probe_success(&mut self, now: DateTime<Utc>) -> bool {
        let recovered = !self.is_healthy;
        self.is_healthy = true;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_checked_at = Some(now);
        recovered
    }

    /// Apply a failed probe. Returns true if the provider just became unhealthy.
    pub(crate) fn record_probe_failure(
        &mut self,
        now: DateTime<Utc>,
        error: String,
        threshold: u32,
    ) -> bool {
        self.last_checked_at = Some(now);
        self.record_failure(error, threshold)
    }

    /// Apply a failed dispatch attempt. Returns true if the provider just
    /// became unhealthy.
    pub(crate) fn record_dispatch_failure(&mut self, error: String, threshold: u32) -> bool {
        self.record_failure(error, threshold)
    }

    /// A successful dispatch breaks a run of consecutive failures
    pub(crate) fn record_dispatch_success(&mut self) {
        if self.is_healthy {
            self.consecutive_failures = 0;
        }
    }

    fn record_failure(&mut self, error: String, threshold: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        if self.is_healthy && self.consecutive_failures >= threshold.max(1) {
            self.is_healthy = false;
            return true;
        }
        false
    }
}
