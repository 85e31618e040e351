//! Operation requests, results and the attempt trail

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::providers::{is_safe_key, CapabilityType, ErrorClass};

/// Longest message body accepted (ten concatenated SMS segments)
pub const MAX_MESSAGE_LENGTH: usize = 1600;

/// Longest idempotency key accepted
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 255;

static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("valid phone number pattern"));

/// Capability-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    Message {
        recipient: String,
        body: String,
    },
    File {
        key: String,
        content_type: String,
        bytes: Bytes,
    },
}

impl OperationPayload {
    /// Capability this payload is meant for
    pub fn capability(&self) -> CapabilityType {
        match self {
            OperationPayload::Message { .. } => CapabilityType::Sms,
            OperationPayload::File { .. } => CapabilityType::Storage,
        }
    }
}

/// An operation submitted by feature code
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Opaque token forwarded to the provider so retries do not double-send
    pub idempotency_key: String,
    pub payload: OperationPayload,
}

impl OperationRequest {
    /// A message request with a fresh idempotency key
    pub fn message(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            idempotency_key: Uuid::new_v4().to_string(),
            payload: OperationPayload::Message {
                recipient: recipient.into(),
                body: body.into(),
            },
        }
    }

    /// A file store request with a fresh idempotency key
    pub fn file(
        key: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            idempotency_key: Uuid::new_v4().to_string(),
            payload: OperationPayload::File {
                key: key.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        }
    }

    /// Use a caller-supplied idempotency key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = key.into();
        self
    }

    /// Check the request before any provider sees it
    pub fn validate_for(&self, capability: CapabilityType) -> Result<(), String> {
        if self.payload.capability() != capability {
            return Err(format!(
                "payload for {} cannot be dispatched to {}",
                self.payload.capability(),
                capability
            ));
        }

        let key = &self.idempotency_key;
        if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
            return Err(format!(
                "idempotency key must be 1-{} characters",
                MAX_IDEMPOTENCY_KEY_LENGTH
            ));
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err("idempotency key must be printable ASCII without spaces".to_string());
        }

        match &self.payload {
            OperationPayload::Message { recipient, body } => {
                if !PHONE_NUMBER.is_match(recipient) {
                    return Err(format!("invalid recipient phone number: {}", recipient));
                }
                if body.trim().is_empty() {
                    return Err("message body must not be empty".to_string());
                }
                if body.chars().count() > MAX_MESSAGE_LENGTH {
                    return Err(format!(
                        "message body exceeds {} characters",
                        MAX_MESSAGE_LENGTH
                    ));
                }
            }
            OperationPayload::File {
                key,
                content_type,
                bytes,
            } => {
                if !is_safe_key(key) {
                    return Err(format!("invalid storage key: {}", key));
                }
                if content_type.is_empty()
                    || !content_type.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
                {
                    return Err(format!("invalid content type: {:?}", content_type));
                }
                if bytes.is_empty() {
                    return Err("file must not be empty".to_string());
                }
            }
        }
        Ok(())
    }
}

/// One provider attempt within a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub provider_id: String,
    /// 1-based position in the attempt sequence
    pub attempt: usize,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub duration_ms: u64,
}

impl AttemptRecord {
    pub fn succeeded(provider_id: &str, attempt: usize, duration_ms: u64) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            attempt,
            succeeded: true,
            error: None,
            error_class: None,
            duration_ms,
        }
    }

    pub fn failed(
        provider_id: &str,
        attempt: usize,
        error: String,
        class: ErrorClass,
        duration_ms: u64,
    ) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            attempt,
            succeeded: false,
            error: Some(error),
            error_class: Some(class),
            duration_ms,
        }
    }
}

/// Outcome of a dispatched operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Provider that completed the operation, if any did
    pub provider_id: Option<String>,
    pub succeeded: bool,
    pub attempted_provider_ids: Vec<String>,
    pub attempts: Vec<AttemptRecord>,
    /// Provider-side reference (message id, object location)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub(crate) fn success(
        provider_id: &str,
        attempts: Vec<AttemptRecord>,
        reference: Option<String>,
        cost: f64,
    ) -> Self {
        Self {
            provider_id: Some(provider_id.to_string()),
            succeeded: true,
            attempted_provider_ids: attempts.iter().map(|a| a.provider_id.clone()).collect(),
            attempts,
            reference,
            cost: Some(cost),
            error: None,
        }
    }

    /// Failed result carrying the attempt trail of `error`
    pub fn failure(error: &super::DispatchError) -> Self {
        let attempts = error.attempts().to_vec();
        Self {
            provider_id: None,
            succeeded: false,
            attempted_provider_ids: attempts.iter().map(|a| a.provider_id.clone()).collect(),
            attempts,
            reference: None,
            cost: None,
            error: Some(error.to_string()),
        }
    }
}
