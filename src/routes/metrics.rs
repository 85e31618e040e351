//! Prometheus metrics endpoint
//!
//! Exposes dispatch, provider attempt and health probe metrics in Prometheus
//! format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "conduit_dispatch_total",
        "Total number of dispatched operations by outcome"
    );
    metrics::describe_histogram!(
        "conduit_dispatch_duration_seconds",
        "End-to-end dispatch duration in seconds, including failover"
    );
    metrics::describe_counter!(
        "conduit_provider_attempts_total",
        "Total provider attempts by result"
    );
    metrics::describe_counter!(
        "conduit_health_probes_total",
        "Total health probes by result"
    );
    metrics::describe_gauge!(
        "conduit_provider_healthy",
        "1 if the provider is currently healthy, 0 otherwise"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished dispatch
pub fn record_dispatch(capability: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "conduit_dispatch_total",
        "capability" => capability.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("conduit_dispatch_duration_seconds", "capability" => capability.to_string())
        .record(duration_secs);
}

/// Record a single provider attempt
pub fn record_attempt(provider: &str, result: &str) {
    metrics::counter!(
        "conduit_provider_attempts_total",
        "provider" => provider.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a health probe
pub fn record_probe(provider: &str, result: &str) {
    metrics::counter!(
        "conduit_health_probes_total",
        "provider" => provider.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Update the provider health gauge
pub fn set_provider_health(provider: &str, healthy: bool) {
    metrics::gauge!("conduit_provider_healthy", "provider" => provider.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
