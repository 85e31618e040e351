//! Provider configuration and transport adapters
//!
//! Provider records are produced by the configuration collaborator (settings
//! screens, the providers file) and consumed here. Each record carries a
//! closed, tagged settings variant that is validated before the provider is
//! registered, and a transport adapter is built from those settings.

pub mod http;
pub mod local_disk;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use std::fmt;
use std::path::{Component, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub use http::{ObjectStoreTransport, SmsWebhookTransport};
pub use local_disk::LocalDiskTransport;
pub use transport::{ErrorClass, ProviderTransport, Receipt, TransportError, TransportFactory};

/// Category of operation a provider fulfills
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityType {
    /// Send-message gateways
    Sms,
    /// Store-file backends
    Storage,
}

impl CapabilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityType::Sms => "sms",
            CapabilityType::Storage => "storage",
        }
    }

    pub fn all() -> [CapabilityType; 2] {
        [CapabilityType::Sms, CapabilityType::Storage]
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(CapabilityType::Sms),
            "storage" => Ok(CapabilityType::Storage),
            other => Err(AppError::BadRequest(format!("Unknown capability: {}", other))),
        }
    }
}

/// Backend-specific settings, one variant per provider kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// HTTP gateway that accepts `POST {base_url}/messages`
    #[serde(rename_all = "camelCase")]
    SmsWebhook {
        base_url: String,
        api_key: String,
        #[serde(default)]
        sender_id: Option<String>,
        #[serde(default)]
        cost_per_message: f64,
    },
    /// HTTP object store addressed as `{base_url}/{bucket}/{key}`
    #[serde(rename_all = "camelCase")]
    ObjectStore {
        base_url: String,
        bucket: String,
        api_key: String,
        #[serde(default)]
        cost_per_gb: f64,
    },
    /// Files written under a directory on the local filesystem
    #[serde(rename_all = "camelCase")]
    LocalDisk {
        root_dir: PathBuf,
        #[serde(default)]
        cost_per_gb: f64,
    },
}

impl ProviderSettings {
    /// Name of the concrete backend kind
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderSettings::SmsWebhook { .. } => "sms_webhook",
            ProviderSettings::ObjectStore { .. } => "object_store",
            ProviderSettings::LocalDisk { .. } => "local_disk",
        }
    }

    /// Capability this kind of backend can fulfill
    pub fn capability(&self) -> CapabilityType {
        match self {
            ProviderSettings::SmsWebhook { .. } => CapabilityType::Sms,
            ProviderSettings::ObjectStore { .. } | ProviderSettings::LocalDisk { .. } => {
                CapabilityType::Storage
            }
        }
    }

    /// Validate the settings before they are handed to a transport
    pub fn validate(&self) -> AppResult<()> {
        match self {
            ProviderSettings::SmsWebhook {
                base_url,
                api_key,
                cost_per_message,
                ..
            } => {
                validate_url(base_url)?;
                require_non_empty("apiKey", api_key)?;
                validate_cost("costPerMessage", *cost_per_message)
            }
            ProviderSettings::ObjectStore {
                base_url,
                bucket,
                api_key,
                cost_per_gb,
            } => {
                validate_url(base_url)?;
                require_non_empty("bucket", bucket)?;
                if bucket.contains('/') {
                    return Err(AppError::InvalidConfig(format!(
                        "bucket must not contain '/': {}",
                        bucket
                    )));
                }
                require_non_empty("apiKey", api_key)?;
                validate_cost("costPerGb", *cost_per_gb)
            }
            ProviderSettings::LocalDisk {
                root_dir,
                cost_per_gb,
            } => {
                if root_dir.as_os_str().is_empty() {
                    return Err(AppError::InvalidConfig("rootDir must not be empty".into()));
                }
                validate_cost("costPerGb", *cost_per_gb)
            }
        }
    }
}

fn validate_url(raw: &str) -> AppResult<()> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| AppError::InvalidConfig(format!("baseUrl {:?} is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::InvalidConfig(format!(
            "baseUrl must use http or https, got {}",
            scheme
        ))),
    }
}

fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidConfig(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_cost(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidConfig(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}

/// Check that a storage key is a plain relative path
pub(crate) fn is_safe_key(key: &str) -> bool {
    let path = std::path::Path::new(key);
    !key.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn default_true() -> bool {
    true
}

/// A provider configuration record as produced by the settings collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    pub capability: CapabilityType,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub settings: ProviderSettings,
}

impl ProviderConfig {
    /// Validate identity fields and settings
    pub fn validate(&self) -> AppResult<()> {
        require_non_empty("id", &self.id)?;
        require_non_empty("name", &self.name)?;
        if self.settings.capability() != self.capability {
            return Err(AppError::InvalidConfig(format!(
                "provider kind {} serves {}, not {}",
                self.settings.kind(),
                self.settings.capability(),
                self.capability
            )));
        }
        self.settings.validate()
    }

    /// Apply a partial update, producing the new record
    pub fn merged(&self, update: &ProviderUpdate) -> ProviderConfig {
        ProviderConfig {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            capability: self.capability,
            priority: update.priority.unwrap_or(self.priority),
            is_enabled: update.is_enabled.unwrap_or(self.is_enabled),
            is_active: update.is_active.unwrap_or(self.is_active),
            settings: update
                .settings
                .clone()
                .unwrap_or_else(|| self.settings.clone()),
        }
    }
}

/// Partial update of a provider record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub settings: Option<ProviderSettings>,
}

/// Load provider records from a JSON file
pub fn load_provider_file(path: &std::path::Path) -> anyhow::Result<Vec<ProviderConfig>> {
    use anyhow::Context;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read providers file {}", path.display()))?;
    let configs: Vec<ProviderConfig> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid providers file {}", path.display()))?;
    Ok(configs)
}
