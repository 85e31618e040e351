//! Failover decisions
//!
//! Pure logic deciding whether a failed attempt moves on to the next
//! candidate or ends the request.

use crate::providers::{ErrorClass, TransportError};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RetryNext,
    Abort,
}

/// Policy consulted by the dispatcher after every failed attempt
pub trait FailoverPolicy: Send + Sync {
    /// `attempt_number` is 1-based; `remaining_candidates` counts providers
    /// not yet tried for this request.
    fn decide(
        &self,
        error: &TransportError,
        attempt_number: usize,
        remaining_candidates: usize,
    ) -> Decision;
}

/// Retry provider-local failures on the next candidate, abort on bad requests
#[derive(Debug, Clone, Default)]
pub struct DefaultFailoverPolicy {
    /// Ceiling on attempts per request; `None` tries every eligible candidate
    max_attempts: Option<usize>,
}

impl DefaultFailoverPolicy {
    pub fn new(max_attempts: Option<usize>) -> Self {
        Self { max_attempts }
    }
}

impl FailoverPolicy for DefaultFailoverPolicy {
    fn decide(
        &self,
        error: &TransportError,
        attempt_number: usize,
        remaining_candidates: usize,
    ) -> Decision {
        if error.class() == ErrorClass::RequestInvalid {
            return Decision::Abort;
        }
        if remaining_candidates == 0 {
            return Decision::Abort;
        }
        match self.max_attempts {
            Some(max) if attempt_number >= max => Decision::Abort,
            _ => Decision::RetryNext,
        }
    }
}
