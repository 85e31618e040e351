//! Operation endpoints
//!
//! Thin HTTP entry points in front of the dispatcher. A caller-supplied
//! `Idempotency-Key` header is passed through unchanged; without one a fresh
//! key is generated per request.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    dispatch::{OperationRequest, OperationResult},
    error::{AppError, AppResult},
    providers::CapabilityType,
    AppState,
};

use super::providers::parse_body;

const IDEMPOTENCY_KEY: &str = "idempotency-key";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Message send request
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub body: String,
}

fn idempotency_key(headers: &HeaderMap) -> AppResult<Option<String>> {
    headers
        .get(IDEMPOTENCY_KEY)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| AppError::BadRequest("Idempotency-Key must be ASCII".to_string()))
        })
        .transpose()
}

fn with_key(request: OperationRequest, key: Option<String>) -> OperationRequest {
    match key {
        Some(key) => request.with_idempotency_key(key),
        None => request,
    }
}

/// POST /v1/sms/send
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<OperationResult>> {
    let message: SendMessageRequest = parse_body(&body)?;
    let request = with_key(
        OperationRequest::message(message.to, message.body),
        idempotency_key(&headers)?,
    );

    debug!(idempotency_key = %request.idempotency_key, "Dispatching message");
    let result = state
        .dispatcher
        .dispatch_with_cancel(CapabilityType::Sms, request, &state.shutdown)
        .await?;
    Ok(Json(result))
}

/// PUT /v1/files/*key
pub async fn store_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<OperationResult>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let key = key.trim_start_matches('/').to_string();
    let request = with_key(
        OperationRequest::file(key, content_type, body),
        idempotency_key(&headers)?,
    );

    debug!(idempotency_key = %request.idempotency_key, "Dispatching file");
    let result = state
        .dispatcher
        .dispatch_with_cancel(CapabilityType::Storage, request, &state.shutdown)
        .await?;
    Ok(Json(result))
}
