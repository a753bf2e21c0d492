use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::core::error::AppError;

/// Filesystem storage rooted at a configured directory.
///
/// Keys are relative paths like `invoices/42/scan.pdf`; anything that would
/// escape the root is rejected.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create storage root '{}': {}",
                self.root.display(),
                e
            ))
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        // Keys must stay below the root: no absolute paths, no `..`
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(AppError::BadRequest(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("File '{}' not found", key))
            } else {
                AppError::Internal(format!("Failed to read file '{}': {}", key, e))
            }
        })
    }

    pub async fn write(&self, key: &str, data: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create directory for '{}': {}", key, e))
            })?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file '{}': {}", key, e)))?;

        debug!("Wrote file '{}' under '{}'", key, self.root.display());
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted file '{}' under '{}'", key, self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to delete file '{}': {}",
                key, e
            ))),
        }
    }
}
