//! Transport adapter abstraction
//!
//! Defines the trait every backend adapter implements so the dispatcher and
//! the health monitor can drive SMS gateways and storage backends through a
//! single interface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::dispatch::OperationRequest;

use super::{LocalDiskTransport, ObjectStoreTransport, ProviderSettings, SmsWebhookTransport};

/// How a failed attempt should be treated by failover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The provider could not serve the request; another provider might
    ProviderLocal,
    /// The request itself is bad; no provider will accept it
    RequestInvalid,
}

/// Failure of a single provider call
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(String),
}

impl TransportError {
    /// Classify the error for the failover policy
    pub fn class(&self) -> ErrorClass {
        match self {
            TransportError::Timeout(_)
            | TransportError::Connection(_)
            | TransportError::Upstream { .. }
            | TransportError::Io(_) => ErrorClass::ProviderLocal,
            TransportError::Rejected { .. } | TransportError::Unsupported(_) => {
                ErrorClass::RequestInvalid
            }
        }
    }

    /// Map a non-success HTTP status to a transport error
    ///
    /// 408 and 429 are the provider's problem, other 4xx are the caller's.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            408 | 429 => TransportError::Upstream { status, message },
            400..=499 => TransportError::Rejected { status, message },
            _ => TransportError::Upstream { status, message },
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::from_status(status.as_u16(), err.to_string()),
            None => TransportError::Connection(err.to_string()),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// What a provider reports back for a completed operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Receipt {
    /// Provider-side reference (message id, object location)
    pub reference: Option<String>,
    /// Cost of the operation in provider currency units
    pub cost: f64,
}

/// Trait implemented by every backend adapter
///
/// Implementations MUST forward the request's idempotency key to the backend
/// when it supports one, so a provider-side retry does not double-send.
/// Timeouts are applied by the caller; adapters may block as long as the
/// backend does.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Provider kind for logging and metrics
    fn kind(&self) -> &'static str;

    /// Perform the operation
    async fn invoke(&self, request: &OperationRequest) -> Result<Receipt, TransportError>;

    /// Lightweight availability check used by the health monitor
    async fn health_check(&self) -> Result<(), TransportError>;
}

/// Builds transport adapters from validated settings
#[derive(Clone)]
pub struct TransportFactory {
    client: reqwest::Client,
}

impl TransportFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn build(&self, settings: &ProviderSettings) -> Arc<dyn ProviderTransport> {
        match settings {
            ProviderSettings::SmsWebhook {
                base_url,
                api_key,
                sender_id,
                cost_per_message,
            } => Arc::new(SmsWebhookTransport::new(
                self.client.clone(),
                base_url,
                api_key,
                sender_id.clone(),
                *cost_per_message,
            )),
            ProviderSettings::ObjectStore {
                base_url,
                bucket,
                api_key,
                cost_per_gb,
            } => Arc::new(ObjectStoreTransport::new(
                self.client.clone(),
                base_url,
                bucket,
                api_key,
                *cost_per_gb,
            )),
            ProviderSettings::LocalDisk {
                root_dir,
                cost_per_gb,
            } => Arc::new(LocalDiskTransport::new(root_dir.clone(), *cost_per_gb)),
        }
    }
}

/// Cost of storing `bytes` at `cost_per_gb`
pub(crate) fn storage_cost(bytes: usize, cost_per_gb: f64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0) * cost_per_gb
}
