//! Dispatcher
//!
//! Drives one request through `SELECTING -> INVOKING -> (SUCCEEDED |
//! RETRYING -> INVOKING | EXHAUSTED)`. Candidates are taken from a single
//! registry snapshot and tried strictly in priority order, one at a time,
//! never the same provider twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    health::HealthMonitor,
    providers::{CapabilityType, ErrorClass, TransportError},
    registry::ProviderRegistry,
    usage::{RequestOutcome, UsageAccountant},
};

use super::{
    AttemptRecord, Decision, DispatchError, FailoverPolicy, OperationRequest, OperationResult,
};

/// Configuration for dispatch
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound for a single provider attempt (default: 10 seconds)
    pub attempt_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Routes operations to providers with failover
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    monitor: Arc<HealthMonitor>,
    accountant: Arc<UsageAccountant>,
    policy: Arc<dyn FailoverPolicy>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(
        registry: Arc<ProviderRegistry>,
        monitor: Arc<HealthMonitor>,
        accountant: Arc<UsageAccountant>,
        policy: Arc<dyn FailoverPolicy>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            monitor,
            accountant,
            policy,
            config,
        }
    }

    /// Dispatch an operation to the best eligible provider
    pub async fn dispatch(
        &self,
        capability: CapabilityType,
        request: OperationRequest,
    ) -> Result<OperationResult, DispatchError> {
        self.dispatch_with_cancel(capability, request, &CancellationToken::new())
            .await
    }

    /// Dispatch an operation, stopping before the next attempt once `cancel`
    /// fires
    ///
    /// An attempt already in flight is allowed to finish.
    #[instrument(
        skip(self, request, cancel),
        fields(capability = %capability, idempotency_key = %request.idempotency_key)
    )]
    pub async fn dispatch_with_cancel(
        &self,
        capability: CapabilityType,
        request: OperationRequest,
        cancel: &CancellationToken,
    ) -> Result<OperationResult, DispatchError> {
        let started = Instant::now();
        let result = self.run(capability, &request, cancel).await;

        let (outcome, attempts) = match &result {
            Ok(success) => (RequestOutcome::Succeeded, success.attempts.len()),
            Err(error) => (error.outcome(), error.attempts().len()),
        };
        self.accountant
            .record_outcome(capability, outcome, attempts, started.elapsed());

        match &result {
            Ok(success) => info!(
                provider_id = success.provider_id.as_deref().unwrap_or_default(),
                attempts,
                duration_ms = started.elapsed().as_millis() as u64,
                "Operation dispatched"
            ),
            Err(error) => warn!(
                code = error.code(),
                attempted = ?error.attempted_provider_ids(),
                error = %error,
                "Operation failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        capability: CapabilityType,
        request: &OperationRequest,
        cancel: &CancellationToken,
    ) -> Result<OperationResult, DispatchError> {
        if let Err(message) = request.validate_for(capability) {
            return Err(DispatchError::RequestInvalid {
                capability,
                provider_id: None,
                message,
                attempts: Vec::new(),
            });
        }

        // SELECTING
        let candidates = self.registry.eligible_entries(capability);
        if candidates.is_empty() {
            return Err(DispatchError::NoHealthyProvider { capability });
        }
        debug!(
            candidates = ?candidates.iter().map(|c| c.id()).collect::<Vec<_>>(),
            "Selected candidates"
        );

        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled {
                    capability,
                    attempts,
                });
            }

            // INVOKING
            let attempt_number = index + 1;
            let provider_id = candidate.id();
            let attempt_started = Instant::now();
            let transport = candidate.transport();
            let outcome =
                match tokio::time::timeout(self.config.attempt_timeout, transport.invoke(request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransportError::Timeout(self.config.attempt_timeout)),
                };
            let elapsed_ms = attempt_started.elapsed().as_millis() as u64;

            let error = match outcome {
                Ok(receipt) => {
                    // SUCCEEDED
                    self.accountant.record_success(provider_id, receipt.cost);
                    self.monitor.record_dispatch_success(provider_id);
                    attempts.push(AttemptRecord::succeeded(
                        provider_id,
                        attempt_number,
                        elapsed_ms,
                    ));
                    return Ok(OperationResult::success(
                        provider_id,
                        attempts,
                        receipt.reference,
                        receipt.cost,
                    ));
                }
                Err(error) => error,
            };

            let class = error.class();
            self.accountant.record_failure(provider_id);
            if class == ErrorClass::ProviderLocal {
                self.monitor.record_dispatch_failure(provider_id, &error);
            }
            attempts.push(AttemptRecord::failed(
                provider_id,
                attempt_number,
                error.to_string(),
                class,
                elapsed_ms,
            ));

            let remaining = candidates.len() - attempt_number;
            match self.policy.decide(&error, attempt_number, remaining) {
                Decision::RetryNext => {
                    // RETRYING
                    info!(
                        provider_id = %provider_id,
                        attempt = attempt_number,
                        remaining,
                        error = %error,
                        "Provider attempt failed, failing over to next candidate"
                    );
                }
                Decision::Abort if class == ErrorClass::RequestInvalid => {
                    return Err(DispatchError::RequestInvalid {
                        capability,
                        provider_id: Some(provider_id.to_string()),
                        message: error.to_string(),
                        attempts,
                    });
                }
                Decision::Abort => break,
            }
        }

        // EXHAUSTED
        Err(DispatchError::ExhaustedFailover {
            capability,
            attempts,
        })
    }
}
