//! HTTP-backed provider adapters
//!
//! Forwards operations to SMS webhook gateways and HTTP object stores.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{OperationPayload, OperationRequest};

use super::transport::{storage_cost, ProviderTransport, Receipt, TransportError};

/// Header carrying the caller's idempotency token
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Outgoing message body for webhook gateways
#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    to: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

/// Optional acknowledgement returned by webhook gateways
#[derive(Debug, Default, Deserialize)]
struct SendMessageAck {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    cost: Option<f64>,
}

/// Turn a non-success response into a transport error
async fn error_for_response(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    TransportError::from_status(status, text)
}

/// SMS gateway reachable over a JSON webhook
pub struct SmsWebhookTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender_id: Option<String>,
    cost_per_message: f64,
}

impl SmsWebhookTransport {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        sender_id: Option<String>,
        cost_per_message: f64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sender_id,
            cost_per_message,
        }
    }
}

#[async_trait]
impl ProviderTransport for SmsWebhookTransport {
    fn kind(&self) -> &'static str {
        "sms_webhook"
    }

    async fn invoke(&self, request: &OperationRequest) -> Result<Receipt, TransportError> {
        let OperationPayload::Message { recipient, body } = &request.payload else {
            return Err(TransportError::Unsupported(
                "sms gateways only send messages".to_string(),
            ));
        };

        let url = format!("{}/messages", self.base_url);
        debug!(url = %url, "Sending message via webhook gateway");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .json(&SendMessageBody {
                to: recipient,
                body,
                from: self.sender_id.as_deref(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        // Gateways are not required to return a body
        let text = response.text().await.unwrap_or_default();
        let ack: SendMessageAck = serde_json::from_str(&text).unwrap_or_default();

        Ok(Receipt {
            reference: ack.id,
            cost: ack.cost.unwrap_or(self.cost_per_message),
        })
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        Ok(())
    }
}

/// Object store addressed as `{base_url}/{bucket}/{key}`
pub struct ObjectStoreTransport {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
    cost_per_gb: f64,
}

impl ObjectStoreTransport {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        bucket: &str,
        api_key: &str,
        cost_per_gb: f64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
            cost_per_gb,
        }
    }

    /// `{base_url}/{bucket}/{segments..}` with every segment percent-encoded
    fn object_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, TransportError> {
        let invalid = |reason: String| {
            TransportError::Connection(format!("invalid base url {}: {}", self.base_url, reason))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ProviderTransport for ObjectStoreTransport {
    fn kind(&self) -> &'static str {
        "object_store"
    }

    async fn invoke(&self, request: &OperationRequest) -> Result<Receipt, TransportError> {
        let OperationPayload::File {
            key,
            content_type,
            bytes,
        } = &request.payload
        else {
            return Err(TransportError::Unsupported(
                "object stores only store files".to_string(),
            ));
        };

        let url = self.object_url(key.split('/'))?;
        debug!(url = %url, size = bytes.len(), "Uploading object");

        let response = self
            .client
            .put(url.clone())
            .bearer_auth(&self.api_key)
            .header(IDEMPOTENCY_HEADER, &request.idempotency_key)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        Ok(Receipt {
            reference: Some(url.to_string()),
            cost: storage_cost(bytes.len(), self.cost_per_gb),
        })
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .head(self.object_url(None::<&str>)?)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }
        Ok(())
    }
}
