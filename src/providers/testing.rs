//! Scripted transport for tests
//!
//! Plays back a queue of outcomes so dispatch and health behavior can be
//! exercised without real backends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::dispatch::OperationRequest;

use super::transport::{ProviderTransport, Receipt, TransportError};

/// A scripted outcome for one call
#[derive(Debug, Clone)]
pub enum Scripted {
    Succeed(Receipt),
    Fail(TransportError),
    /// Sleep before succeeding, used to trigger timeouts
    Hang(Duration),
}

/// Transport whose behavior is fixed by the test
///
/// Queued outcomes are consumed in order; once the queue is empty the
/// default outcome repeats.
pub struct ScriptedTransport {
    invocations: Mutex<VecDeque<Scripted>>,
    default_invoke: Mutex<Scripted>,
    probes: Mutex<VecDeque<Scripted>>,
    default_probe: Mutex<Scripted>,
    seen_keys: Mutex<Vec<String>>,
    invoke_count: AtomicUsize,
    probe_count: AtomicUsize,
}

impl ScriptedTransport {
    /// A transport that always succeeds with zero cost
    pub fn healthy() -> Self {
        Self::with_default(Scripted::Succeed(Receipt::default()))
    }

    /// A transport that always succeeds with the given cost
    pub fn costing(cost: f64) -> Self {
        Self::with_default(Scripted::Succeed(Receipt {
            reference: None,
            cost,
        }))
    }

    /// A transport whose every call fails with `error`
    pub fn failing(error: TransportError) -> Self {
        let transport = Self::with_default(Scripted::Fail(error.clone()));
        transport.set_probe_default(Scripted::Fail(error));
        transport
    }

    fn with_default(outcome: Scripted) -> Self {
        Self {
            invocations: Mutex::new(VecDeque::new()),
            default_invoke: Mutex::new(outcome),
            probes: Mutex::new(VecDeque::new()),
            default_probe: Mutex::new(Scripted::Succeed(Receipt::default())),
            seen_keys: Mutex::new(Vec::new()),
            invoke_count: AtomicUsize::new(0),
            probe_count: AtomicUsize::new(0),
        }
    }

    /// Queue an outcome for the next invocation
    pub fn push_invoke(&self, outcome: Scripted) {
        lock(&self.invocations).push_back(outcome);
    }

    /// Replace the repeating invocation outcome
    pub fn set_invoke_default(&self, outcome: Scripted) {
        *lock(&self.default_invoke) = outcome;
    }

    /// Queue an outcome for the next health probe
    pub fn push_probe(&self, outcome: Scripted) {
        lock(&self.probes).push_back(outcome);
    }

    /// Replace the repeating probe outcome
    pub fn set_probe_default(&self, outcome: Scripted) {
        *lock(&self.default_probe) = outcome;
    }

    pub fn invoke_count(&self) -> usize {
        self.invoke_count.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Idempotency keys seen, in call order
    pub fn seen_keys(&self) -> Vec<String> {
        lock(&self.seen_keys).clone()
    }

    async fn play(outcome: Scripted) -> Result<Receipt, TransportError> {
        match outcome {
            Scripted::Succeed(receipt) => Ok(receipt),
            Scripted::Fail(error) => Err(error),
            Scripted::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(Receipt::default())
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ProviderTransport for ScriptedTransport {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn invoke(&self, request: &OperationRequest) -> Result<Receipt, TransportError> {
        self.invoke_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen_keys).push(request.idempotency_key.clone());
        let outcome = lock(&self.invocations)
            .pop_front()
            .unwrap_or_else(|| lock(&self.default_invoke).clone());
        Self::play(outcome).await
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        let outcome = lock(&self.probes)
            .pop_front()
            .unwrap_or_else(|| lock(&self.default_probe).clone());
        Self::play(outcome).await.map(|_| ())
    }
}
