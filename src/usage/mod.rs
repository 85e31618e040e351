//! Usage accounting module
//!
//! Tracks per-provider usage counters and per-capability request outcomes.

pub mod accountant;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use accountant::UsageAccountant;

/// Usage counters for a single provider
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_attempted: u64,
    pub total_succeeded: u64,
    pub total_errors: u64,
    /// Accumulated cost in provider currency units
    pub total_cost: f64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl UsageStats {
    pub(crate) fn record_success(&mut self, cost: f64) {
        self.total_attempted += 1;
        self.total_succeeded += 1;
        if cost.is_finite() && cost > 0.0 {
            self.total_cost += cost;
        }
        self.last_used_at = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self) {
        self.total_attempted += 1;
        self.total_errors += 1;
        self.last_used_at = Some(Utc::now());
    }

    /// Fraction of attempts that succeeded, if any were made
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_attempted == 0 {
            return None;
        }
        Some(self.total_succeeded as f64 / self.total_attempted as f64)
    }
}

/// Terminal state of a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Succeeded,
    Exhausted,
    RequestInvalid,
    NoHealthyProvider,
    Cancelled,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Succeeded => "succeeded",
            RequestOutcome::Exhausted => "exhausted",
            RequestOutcome::RequestInvalid => "request_invalid",
            RequestOutcome::NoHealthyProvider => "no_healthy_provider",
            RequestOutcome::Cancelled => "cancelled",
        }
    }
}

/// Request-level counters for one capability
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total_requests: u64,
    pub succeeded: u64,
    pub exhausted: u64,
    pub request_invalid: u64,
    pub no_healthy_provider: u64,
    pub cancelled: u64,
    /// Provider attempts made across all requests
    pub total_attempts: u64,
    /// Requests that needed more than one attempt
    pub failovers: u64,
}

impl RequestStats {
    pub(crate) fn record(&mut self, outcome: RequestOutcome, attempts: usize) {
        self.total_requests += 1;
        self.total_attempts += attempts as u64;
        if attempts > 1 {
            self.failovers += 1;
        }
        match outcome {
            RequestOutcome::Succeeded => self.succeeded += 1,
            RequestOutcome::Exhausted => self.exhausted += 1,
            RequestOutcome::RequestInvalid => self.request_invalid += 1,
            RequestOutcome::NoHealthyProvider => self.no_healthy_provider += 1,
            RequestOutcome::Cancelled => self.cancelled += 1,
        }
    }
}
