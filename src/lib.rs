//! Conduit - Backend provider orchestrator
//!
//! This library routes capability operations (sending messages, storing
//! files) to interchangeable backend providers. It keeps a registry of
//! configured providers, monitors their health in the background, records
//! per-provider usage and fails over to the next eligible provider when one
//! cannot serve a request.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod usage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use crate::config::Config;
pub use crate::dispatch::{DefaultFailoverPolicy, Dispatcher, OperationRequest, OperationResult};
pub use crate::health::HealthMonitor;
pub use crate::providers::{CapabilityType, ProviderConfig, TransportFactory};
pub use crate::registry::ProviderRegistry;
pub use crate::usage::UsageAccountant;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub registry: Arc<ProviderRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub accountant: Arc<UsageAccountant>,
    pub dispatcher: Arc<Dispatcher>,
    /// Root shutdown token; cancelling it stops the monitor and any further
    /// failover attempts
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new application state
    ///
    /// Providers listed in the configured providers file are registered
    /// before this returns; an invalid record fails start-up.
    pub fn new(config: Config) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let state = Self::with_factory(config, TransportFactory::new(http_client));

        if let Some(path) = state.config.providers_file.as_deref() {
            for provider in providers::load_provider_file(path)? {
                let id = provider.id.clone();
                state
                    .registry
                    .register(provider)
                    .with_context(|| format!("Failed to register provider {}", id))?;
            }
            info!(
                count = state.registry.len(),
                path = %path.display(),
                "Providers loaded"
            );
        }

        Ok(state)
    }

    fn with_factory(config: Config, factory: TransportFactory) -> Self {
        let shutdown = CancellationToken::new();
        let registry = Arc::new(ProviderRegistry::new(factory));
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            config.health_config(),
            shutdown.child_token(),
        ));
        let accountant = Arc::new(UsageAccountant::new(registry.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            monitor.clone(),
            accountant.clone(),
            Arc::new(DefaultFailoverPolicy::new(config.max_attempts)),
            config.dispatch_config(),
        ));

        Self {
            config,
            start_time: Instant::now(),
            registry,
            monitor,
            accountant,
            dispatcher,
            shutdown,
        }
    }

    /// Create an application state with an empty registry and a plain HTTP
    /// client, for tests that register scripted transports directly
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config) -> Self {
        Self::with_factory(config, TransportFactory::new(reqwest::Client::new()))
    }
}
