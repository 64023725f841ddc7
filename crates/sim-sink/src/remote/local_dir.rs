use super::store::{RemoteStore, RemoteStoreError};
use std::path::{Path, PathBuf};

/// A [`RemoteStore`] backed by a second local directory tree. Used in tests
/// and local development in place of an actual object store; a real
/// deployment supplies an S3-backed (or similar) implementation behind the
/// same trait.
pub struct LocalDirRemoteStore {
    root: PathBuf,
}

impl LocalDirRemoteStore {
    pub fn new(root: PathBuf) -> LocalDirRemoteStore {
        LocalDirRemoteStore { root }
    }
}

#[async_trait::async_trait]
impl RemoteStore for LocalDirRemoteStore {
    async fn put(&self, remote_key: &str, local_path: &Path) -> Result<(), RemoteStoreError> {
        let dest = self.root.join(remote_key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &dest).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, RemoteStoreError> {
        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(&root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    e.path()
                        .strip_prefix(&root)
                        .ok()
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|err| RemoteStoreError::Other(err.to_string()))?;
        Ok(keys)
    }

    async fn get(&self, remote_key: &str, local_path: &Path) -> Result<(), RemoteStoreError> {
        let src = self.root.join(remote_key);
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&src, local_path).await?;
        Ok(())
    }
}
