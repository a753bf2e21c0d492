use tracing::warn;

use crate::core::config::{StorageBackendKind, StorageConfig};
use crate::core::error::AppError;

use super::{LocalStorage, ObjectStorageClient};

/// The active storage backend.
///
/// Resolution inspects the variant: only `Remote` is eligible for pre-signed
/// URLs; everything else serves through the gated endpoint.
pub enum FileStorage {
    Local(LocalStorage),
    Remote(ObjectStorageClient),
}

impl FileStorage {
    /// Build the backend selected by configuration.
    ///
    /// An s3 backend without a usable bucket or client degrades to local
    /// storage with a warning instead of failing startup; gated serving
    /// still works in that state.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, AppError> {
        match config.backend {
            StorageBackendKind::S3 => {
                if config.bucket.is_none() {
                    warn!(
                        "STORAGE_BACKEND is 's3' but STORAGE_BUCKET is not set; \
                        falling back to local storage at '{}'",
                        config.local_root.display()
                    );
                    return Self::local(config).await;
                }
                match ObjectStorageClient::new(config) {
                    Ok(client) => {
                        client.ensure_bucket_exists().await?;
                        Ok(FileStorage::Remote(client))
                    }
                    Err(e) => {
                        warn!(
                            "Remote storage client unavailable: {}. \
                            Falling back to local storage",
                            e
                        );
                        Self::local(config).await
                    }
                }
            }
            StorageBackendKind::Local => Self::local(config).await,
        }
    }

    async fn local(config: &StorageConfig) -> Result<Self, AppError> {
        let storage = LocalStorage::new(&config.local_root);
        storage.ensure_root().await?;
        Ok(FileStorage::Local(storage))
    }

    /// The remote client, when object storage is active.
    pub fn remote(&self) -> Option<&ObjectStorageClient> {
        match self {
            FileStorage::Remote(client) => Some(client),
            FileStorage::Local(_) => None,
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        match self {
            FileStorage::Local(s) => s.exists(key).await,
            FileStorage::Remote(c) => c.exists(key).await,
        }
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, AppError> {
        match self {
            FileStorage::Local(s) => s.read(key).await,
            FileStorage::Remote(c) => c.read(key).await,
        }
    }

    pub async fn write(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), AppError> {
        match self {
            FileStorage::Local(s) => s.write(key, data).await,
            FileStorage::Remote(c) => c.write(key, data, content_type).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        match self {
            FileStorage::Local(s) => s.delete(key).await,
            FileStorage::Remote(c) => c.delete(key).await,
        }
    }
}
