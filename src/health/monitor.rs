//! Background health monitor
//!
//! Probes every enabled provider on a fixed interval. Each probe runs as its
//! own task with a bounded timeout, so a hung backend only ever occupies its
//! own probe slot. Cancelling the shutdown token stops the schedule and
//! abandons in-flight probes without applying their results.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    providers::TransportError,
    registry::{ProviderEntry, ProviderRegistry},
    routes::metrics,
};

use super::{HealthConfig, HealthState};

/// Health monitor for registered providers
pub struct HealthMonitor {
    registry: Arc<ProviderRegistry>,
    config: HealthConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl HealthMonitor {
    /// Create a monitor that stops when `shutdown` is cancelled
    pub fn new(
        registry: Arc<ProviderRegistry>,
        config: HealthConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            config,
            shutdown,
            tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Start the probe schedule
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.run().await;
        })
    }

    /// Cancel the schedule and wait for probe tasks to wind down
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Main probe loop
    async fn run(self: Arc<Self>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            probe_timeout_ms = self.config.probe_timeout.as_millis() as u64,
            failure_threshold = self.config.failure_threshold,
            "Starting provider health monitor"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => self.schedule_probes(),
            }
        }

        self.tracker.close();
        self.tracker.wait().await;
        info!("Provider health monitor stopped");
    }

    /// Start one probe task per enabled provider that is not already probing
    fn schedule_probes(self: &Arc<Self>) {
        for entry in self.registry.entries() {
            if !entry.is_enabled() {
                continue;
            }
            if !entry.try_begin_probe() {
                debug!(provider_id = %entry.id(), "Previous probe still running, skipping");
                continue;
            }

            let monitor = Arc::clone(self);
            self.tracker.spawn(async move {
                monitor.probe(&entry).await;
                entry.end_probe();
            });
        }
    }

    /// Probe a provider and apply the result
    ///
    /// Returns `None` if shutdown was requested before the result could be
    /// applied.
    async fn probe(&self, entry: &ProviderEntry) -> Option<HealthState> {
        let transport = entry.transport();
        let timeout = self.config.probe_timeout;

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => return None,
            result = tokio::time::timeout(timeout, transport.health_check()) => {
                result.unwrap_or(Err(TransportError::Timeout(timeout)))
            }
        };

        if self.shutdown.is_cancelled() {
            return None;
        }
        Some(self.apply_probe_result(entry, result))
    }

    fn apply_probe_result(
        &self,
        entry: &ProviderEntry,
        result: Result<(), TransportError>,
    ) -> HealthState {
        let now = Utc::now();
        let id = entry.id();

        match result {
            Ok(()) => {
                metrics::record_probe(id, "success");
                let (recovered, state) = entry.update_health(|health| {
                    (health.record_probe_success(now), health.clone())
                });
                if recovered {
                    info!(provider_id = %id, "Provider recovered, marked healthy");
                    metrics::set_provider_health(id, true);
                }
                state
            }
            Err(error) => {
                metrics::record_probe(id, "failure");
                let threshold = self.config.failure_threshold;
                let (flipped, state) = entry.update_health(|health| {
                    let flipped = health.record_probe_failure(now, error.to_string(), threshold);
                    (flipped, health.clone())
                });
                if flipped {
                    warn!(
                        provider_id = %id,
                        consecutive_failures = state.consecutive_failures,
                        error = %error,
                        "Provider marked unhealthy after failed health checks"
                    );
                    metrics::set_provider_health(id, false);
                } else {
                    debug!(
                        provider_id = %id,
                        consecutive_failures = state.consecutive_failures,
                        error = %error,
                        "Health check failed"
                    );
                }
                state
            }
        }
    }

    /// Probe one provider immediately, outside the schedule
    pub async fn run_health_check_now(&self, provider_id: &str) -> AppResult<HealthState> {
        let entry = self.registry.entry(provider_id)?;
        debug!(provider_id = %provider_id, "Running on-demand health check");
        self.probe(&entry)
            .await
            .ok_or_else(|| AppError::Internal(anyhow!("health monitor is shutting down")))
    }

    /// Count a failed dispatch attempt against the provider's health
    pub fn record_dispatch_failure(&self, provider_id: &str, error: &TransportError) {
        let Ok(entry) = self.registry.entry(provider_id) else {
            return;
        };
        let threshold = self.config.failure_threshold;
        let (flipped, failures) = entry.update_health(|health| {
            let flipped = health.record_dispatch_failure(error.to_string(), threshold);
            (flipped, health.consecutive_failures)
        });

        if flipped {
            warn!(
                provider_id = %provider_id,
                consecutive_failures = failures,
                error = %error,
                "Provider marked unhealthy after failed dispatch attempts"
            );
            metrics::set_provider_health(provider_id, false);
        }
    }

    /// A successful dispatch ends a run of consecutive failures
    pub fn record_dispatch_success(&self, provider_id: &str) {
        if let Ok(entry) = self.registry.entry(provider_id) {
            entry.update_health(|health| health.record_dispatch_success());
        }
    }
}
