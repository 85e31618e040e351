//! Configuration management for Conduit
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::DispatchConfig;
use crate::health::HealthConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// JSON file with the provider records loaded at start-up
    pub providers_file: Option<PathBuf>,

    /// Seconds between scheduled health probes
    pub health_interval_seconds: u64,
    /// Upper bound for a single health probe (in milliseconds)
    pub probe_timeout_ms: u64,
    /// Consecutive failures before a provider is marked unhealthy
    pub failure_threshold: u32,

    /// Upper bound for a single provider attempt (in milliseconds)
    pub attempt_timeout_ms: u64,
    /// Ceiling on provider attempts per request
    pub max_attempts: Option<usize>,

    /// Enable debug endpoints (development only)
    pub debug_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            providers_file: None,
            health_interval_seconds: 30,
            probe_timeout_ms: 5000,
            failure_threshold: 3,
            attempt_timeout_ms: 10_000,
            max_attempts: None,
            debug_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("CONDUIT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("CONDUIT_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid CONDUIT_PORT")?,

            providers_file: env::var("CONDUIT_PROVIDERS_FILE").ok().map(PathBuf::from),

            health_interval_seconds: env::var("CONDUIT_HEALTH_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid CONDUIT_HEALTH_INTERVAL_SECONDS")?,
            probe_timeout_ms: env::var("CONDUIT_PROBE_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid CONDUIT_PROBE_TIMEOUT_MS")?,
            failure_threshold: env::var("CONDUIT_FAILURE_THRESHOLD")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid CONDUIT_FAILURE_THRESHOLD")?,

            attempt_timeout_ms: env::var("CONDUIT_ATTEMPT_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .context("Invalid CONDUIT_ATTEMPT_TIMEOUT_MS")?,
            max_attempts: env::var("CONDUIT_MAX_ATTEMPTS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid CONDUIT_MAX_ATTEMPTS")?,

            debug_enabled: env::var("CONDUIT_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.health_interval_seconds > 0,
            "CONDUIT_HEALTH_INTERVAL_SECONDS must be greater than 0"
        );
        anyhow::ensure!(
            self.probe_timeout_ms > 0,
            "CONDUIT_PROBE_TIMEOUT_MS must be greater than 0"
        );
        anyhow::ensure!(
            self.failure_threshold > 0,
            "CONDUIT_FAILURE_THRESHOLD must be greater than 0"
        );
        anyhow::ensure!(
            self.attempt_timeout_ms > 0,
            "CONDUIT_ATTEMPT_TIMEOUT_MS must be greater than 0"
        );
        anyhow::ensure!(
            self.max_attempts != Some(0),
            "CONDUIT_MAX_ATTEMPTS must be greater than 0"
        );
        Ok(())
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            interval: Duration::from_secs(self.health_interval_seconds),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            failure_threshold: self.failure_threshold,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }
}
