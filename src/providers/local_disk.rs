//! Local filesystem storage backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::dispatch::{OperationPayload, OperationRequest};

use super::is_safe_key;
use super::transport::{storage_cost, ProviderTransport, Receipt, TransportError};

/// Stores files under `root_dir`
///
/// Every write goes to its own staging file and is renamed into place, so
/// a retried or concurrent request never leaves a torn file.
pub struct LocalDiskTransport {
    root_dir: PathBuf,
    cost_per_gb: f64,
}

impl LocalDiskTransport {
    pub fn new(root_dir: PathBuf, cost_per_gb: f64) -> Self {
        Self {
            root_dir,
            cost_per_gb,
        }
    }
}

#[async_trait]
impl ProviderTransport for LocalDiskTransport {
    fn kind(&self) -> &'static str {
        "local_disk"
    }

    async fn invoke(&self, request: &OperationRequest) -> Result<Receipt, TransportError> {
        let OperationPayload::File { key, bytes, .. } = &request.payload else {
            return Err(TransportError::Unsupported(
                "local disk only stores files".to_string(),
            ));
        };
        if !is_safe_key(key) {
            return Err(TransportError::Rejected {
                status: 400,
                message: format!("unsafe storage key: {}", key),
            });
        }

        let target = self.root_dir.join(key);
        if let Ok(metadata) = tokio::fs::metadata(&target).await {
            if metadata.is_dir() {
                return Err(TransportError::Rejected {
                    status: 409,
                    message: format!("storage key names a directory: {}", key),
                });
            }
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.root_dir.join(format!(".{}.part", Uuid::new_v4()));
        write_staged(&staging, bytes, &target).await?;

        Ok(Receipt {
            reference: Some(target.display().to_string()),
            cost: storage_cost(bytes.len(), self.cost_per_gb),
        })
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let metadata = tokio::fs::metadata(&self.root_dir).await?;
        if !metadata.is_dir() {
            return Err(TransportError::Io(format!(
                "{} is not a directory",
                self.root_dir.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(TransportError::Io(format!(
                "{} is read-only",
                self.root_dir.display()
            )));
        }
        Ok(())
    }
}

/// Write `bytes` to `staging` and rename it onto `target`, removing the
/// staging file if any step fails
async fn write_staged(staging: &Path, bytes: &[u8], target: &Path) -> std::io::Result<()> {
    let result = async {
        let mut file = tokio::fs::File::create(staging).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(staging, target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(staging).await;
    }
    result
}
