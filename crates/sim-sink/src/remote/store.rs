use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RemoteStoreError {
    #[error("remote store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote store error: {0}")]
    Other(String),
}

/// The "thin external collaborator" boundary for uploading completed
/// fixtures to a durable remote store (spec §1 treats S3 uploads as a
/// plain "upload this file" contract behind the sink interface).
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Uploads the local file at `local_path` to `remote_key`.
    async fn put(&self, remote_key: &str, local_path: &Path) -> Result<(), RemoteStoreError>;

    /// Lists all remote keys currently present, for idempotent resync.
    async fn list(&self) -> Result<Vec<String>, RemoteStoreError>;

    /// Downloads `remote_key` to `local_path`.
    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<(), RemoteStoreError>;
}
