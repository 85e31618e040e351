//! Error types for Conduit
//!
//! This module defines the application-level error type and its mapping to
//! HTTP responses. Dispatch failures carry their own error type
//! ([`DispatchError`]) which is wrapped here so the attempt trail reaches
//! the caller unchanged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dispatch::{AttemptRecord, DispatchError},
    providers::CapabilityType,
};

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Provider not found: {0}")]
    NotFound(String),

    #[error("Provider {id} is already registered for capability {existing}, cannot re-register it for {requested}")]
    DuplicateId {
        id: String,
        existing: CapabilityType,
        requested: CapabilityType,
    },

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Dispatch diagnostics attached to failed operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub attempted_provider_ids: Vec<String>,
    pub attempts: Vec<AttemptRecord>,
}

impl ErrorDetails {
    fn from_attempts(
        capability: Option<CapabilityType>,
        provider_id: Option<String>,
        attempts: &[AttemptRecord],
    ) -> Self {
        Self {
            capability,
            provider_id,
            attempted_provider_ids: attempts.iter().map(|a| a.provider_id.clone()).collect(),
            attempts: attempts.to_vec(),
        }
    }
}

impl AppError {
    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateId { .. } => "DUPLICATE_ID",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Dispatch(e) => e.code(),
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code().to_string();
        let (status, message, details) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            AppError::DuplicateId { .. } => (StatusCode::CONFLICT, self.to_string(), None),
            AppError::InvalidConfig(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Dispatch(err) => {
                let status = match err {
                    DispatchError::NoHealthyProvider { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    DispatchError::RequestInvalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    DispatchError::ExhaustedFailover { .. } => StatusCode::BAD_GATEWAY,
                    DispatchError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
                };
                let provider_id = match err {
                    DispatchError::RequestInvalid { provider_id, .. } => provider_id.clone(),
                    _ => None,
                };
                (
                    status,
                    err.to_string(),
                    Some(ErrorDetails::from_attempts(
                        err.capability(),
                        provider_id,
                        err.attempts(),
                    )),
                )
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
