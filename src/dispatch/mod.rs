//! Operation dispatch
//!
//! Routes operations to the best eligible provider and fails over to the
//! next one when a provider cannot serve the request.

pub mod dispatcher;
pub mod policy;
pub mod request;

use thiserror::Error;

use crate::{providers::CapabilityType, usage::RequestOutcome};

pub use dispatcher::{DispatchConfig, Dispatcher};
pub use policy::{Decision, DefaultFailoverPolicy, FailoverPolicy};
pub use request::{AttemptRecord, OperationPayload, OperationRequest, OperationResult};

/// Terminal failure of a dispatched operation
///
/// Every variant that reached a provider carries the full attempt trail.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("No healthy provider available for {capability}")]
    NoHealthyProvider { capability: CapabilityType },

    #[error("Request rejected as invalid: {message}")]
    RequestInvalid {
        capability: CapabilityType,
        /// Provider that rejected it, or `None` if rejected before dispatch
        provider_id: Option<String>,
        message: String,
        attempts: Vec<AttemptRecord>,
    },

    #[error("All {} attempted providers for {capability} failed", .attempts.len())]
    ExhaustedFailover {
        capability: CapabilityType,
        attempts: Vec<AttemptRecord>,
    },

    #[error("Dispatch for {capability} cancelled after {} attempts", .attempts.len())]
    Cancelled {
        capability: CapabilityType,
        attempts: Vec<AttemptRecord>,
    },
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::NoHealthyProvider { .. } => "NO_HEALTHY_PROVIDER",
            DispatchError::RequestInvalid { .. } => "REQUEST_INVALID",
            DispatchError::ExhaustedFailover { .. } => "EXHAUSTED_FAILOVER",
            DispatchError::Cancelled { .. } => "CANCELLED",
        }
    }

    pub fn capability(&self) -> Option<CapabilityType> {
        match self {
            DispatchError::NoHealthyProvider { capability }
            | DispatchError::RequestInvalid { capability, .. }
            | DispatchError::ExhaustedFailover { capability, .. }
            | DispatchError::Cancelled { capability, .. } => Some(*capability),
        }
    }

    /// Attempts made before the request ended, in order
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            DispatchError::NoHealthyProvider { .. } => &[],
            DispatchError::RequestInvalid { attempts, .. }
            | DispatchError::ExhaustedFailover { attempts, .. }
            | DispatchError::Cancelled { attempts, .. } => attempts,
        }
    }

    /// Provider ids tried, in order
    pub fn attempted_provider_ids(&self) -> Vec<String> {
        self.attempts()
            .iter()
            .map(|attempt| attempt.provider_id.clone())
            .collect()
    }

    pub(crate) fn outcome(&self) -> RequestOutcome {
        match self {
            DispatchError::NoHealthyProvider { .. } => RequestOutcome::NoHealthyProvider,
            DispatchError::RequestInvalid { .. } => RequestOutcome::RequestInvalid,
            DispatchError::ExhaustedFailover { .. } => RequestOutcome::Exhausted,
            DispatchError::Cancelled { .. } => RequestOutcome::Cancelled,
        }
    }
}
