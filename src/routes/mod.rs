//! HTTP routes for Conduit
//!
//! This module defines all HTTP endpoints exposed by the orchestrator.

pub mod debug;
pub mod dispatch;
pub mod health;
pub mod metrics;
pub mod providers;
pub mod stats;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route(
            "/v1/providers",
            get(providers::list_providers).post(providers::register_provider),
        )
        .route(
            "/v1/providers/:id",
            get(providers::get_provider)
                .patch(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .route("/v1/providers/:id/enabled", put(providers::set_enabled))
        .route("/v1/providers/:id/active", put(providers::set_active))
        .route(
            "/v1/providers/:id/health-check",
            post(providers::run_health_check),
        )
        .route("/v1/stats/:capability", get(stats::capability_stats));

    let operation_routes = Router::new()
        .route("/v1/sms/send", post(dispatch::send_message))
        .route("/v1/files/*key", put(dispatch::store_file));

    // Public routes (health checks, metrics)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/debug/config", get(debug::config_info))
        .route("/debug/providers", get(debug::provider_configs));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(operation_routes)
        // Global middleware (applied to all routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
