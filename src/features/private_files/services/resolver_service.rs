use std::sync::Arc;

use tracing::warn;

use crate::core::error::{AppError, Result};
use crate::features::private_files::descriptor::FieldDescriptor;
use crate::features::private_files::models::FileReference;
use crate::modules::storage::FileStorage;
use crate::shared::constants::{ACCESS_KEY_PARAM, DEFAULT_PRESIGN_EXPIRY_SECS};

use super::AccessTokenService;

/// Decides the URL handed back for a stored file.
///
/// Two strategies, tried in order: a pre-signed remote-storage link when
/// object storage is active, then the indirect gated URL. Pre-sign failures
/// are never surfaced; they fall through to the gated URL.
pub struct UrlResolver {
    storage: Arc<FileStorage>,
    tokens: Arc<AccessTokenService>,
    presign_expiry_secs: u32,
}

impl UrlResolver {
    pub fn new(
        storage: Arc<FileStorage>,
        tokens: Arc<AccessTokenService>,
        presign_expiry_secs: Option<u32>,
    ) -> Self {
        Self {
            storage,
            tokens,
            presign_expiry_secs: presign_expiry_secs.unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS),
        }
    }

    /// Resolve the URL for `file` under `descriptor`'s policy.
    ///
    /// The reference must point at a stored file. Single-use fields get a
    /// fresh access key appended to the gated URL; pre-signed URLs carry
    /// their own expiry and need no key.
    pub async fn resolve(
        &self,
        file: &FileReference,
        descriptor: &FieldDescriptor,
    ) -> Result<String> {
        if file.stored_path.is_empty() {
            return Err(AppError::NoFileAssociated(format!(
                "field '{}' of {}.{} pk={} has no file associated with it",
                file.field_name, file.app_label, file.model_name, file.pk
            )));
        }

        if let Some(url) = self.try_presigned(file).await {
            return Ok(url);
        }

        let mut url = gated_url(file);
        if descriptor.single_use() {
            let key = self.tokens.mint(file).await?;
            url.push_str(&format!("?{}={}", ACCESS_KEY_PARAM, key));
        }
        Ok(url)
    }

    /// Pre-signed GET against remote storage; `None` means "try the next
    /// strategy" — either no remote backend, or signing failed.
    async fn try_presigned(&self, file: &FileReference) -> Option<String> {
        let remote = self.storage.remote()?;
        match remote
            .presign_get(&file.stored_path, self.presign_expiry_secs)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(
                    "Pre-signed URL generation failed for '{}': {}. \
                    Falling back to the gated URL",
                    file.stored_path, e
                );
                None
            }
        }
    }
}

/// Indirect gated URL: `/<app>/<model>/<field>/<pk>/<filename>`.
pub fn gated_url(file: &FileReference) -> String {
    format!(
        "/{}/{}/{}/{}/{}",
        file.app_label,
        file.model_name,
        file.field_name,
        file.pk,
        urlencoding::encode(file.filename())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{StorageBackendKind, StorageConfig};
    use crate::modules::cache::{InMemoryTokenCache, TokenCache};
    use crate::modules::storage::{LocalStorage, ObjectStorageClient};
    use crate::shared::validation::ACCESS_KEY_REGEX;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Cache that counts writes, for asserting nothing was stored.
    #[derive(Default)]
    struct SpyCache {
        sets: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TokenCache for SpyCache {
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn take(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn local_storage() -> Arc<FileStorage> {
        Arc::new(FileStorage::Local(LocalStorage::new("/tmp/filegate-tests")))
    }

    fn tokens_with(cache: Arc<dyn TokenCache>) -> Arc<AccessTokenService> {
        Arc::new(AccessTokenService::new(cache, Duration::from_secs(3600)))
    }

    fn s3_config() -> StorageConfig {
        StorageConfig {
            backend: StorageBackendKind::S3,
            local_root: "/tmp/filegate-tests".into(),
            bucket: Some("gated-files".to_string()),
            endpoint: "http://localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            presign_expiry_secs: None,
        }
    }

    fn file() -> FileReference {
        FileReference::test_fixture("documents", "report", "scan", "42", "reports/42/a.pdf")
    }

    #[tokio::test]
    async fn test_local_backend_resolves_to_gated_url() {
        let resolver = UrlResolver::new(
            local_storage(),
            tokens_with(Arc::new(InMemoryTokenCache::new())),
            None,
        );

        let url = resolver
            .resolve(&file(), &FieldDescriptor::new("reports"))
            .await
            .unwrap();
        assert_eq!(url, "/documents/report/scan/42/a.pdf");
    }

    #[tokio::test]
    async fn test_gated_url_percent_encodes_the_filename() {
        let file = FileReference::test_fixture(
            "documents",
            "report",
            "scan",
            "42",
            "reports/42/annual report.pdf",
        );
        assert_eq!(
            gated_url(&file),
            "/documents/report/scan/42/annual%20report.pdf"
        );
    }

    #[tokio::test]
    async fn test_reusable_fields_resolve_idempotently_without_access_key() {
        let resolver = UrlResolver::new(
            local_storage(),
            tokens_with(Arc::new(InMemoryTokenCache::new())),
            None,
        );
        let descriptor = FieldDescriptor::new("reports");

        let first = resolver.resolve(&file(), &descriptor).await.unwrap();
        let second = resolver.resolve(&file(), &descriptor).await.unwrap();

        assert_eq!(first, second);
        assert!(!first.contains("access-key"));
    }

    #[tokio::test]
    async fn test_single_use_fields_mint_distinct_keys() {
        let cache = Arc::new(InMemoryTokenCache::new());
        let tokens = tokens_with(cache.clone());
        let resolver = UrlResolver::new(local_storage(), tokens, None);
        let descriptor = FieldDescriptor::new("reports").with_single_use(true);

        let first = resolver.resolve(&file(), &descriptor).await.unwrap();
        let second = resolver.resolve(&file(), &descriptor).await.unwrap();
        assert_ne!(first, second);

        let key = first.split("access-key=").nth(1).unwrap();
        assert!(ACCESS_KEY_REGEX.is_match(key));

        // The cache entry reconstructs the exact identity tuple in the URL
        let value = cache.take(key).await.unwrap();
        assert_eq!(value.as_deref(), Some("documents-report-scan-42-a.pdf"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_and_writes_no_token() {
        let spy = Arc::new(SpyCache::default());
        let resolver = UrlResolver::new(local_storage(), tokens_with(spy.clone()), None);
        let descriptor = FieldDescriptor::new("reports").with_single_use(true);

        let empty = FileReference::test_fixture("documents", "report", "scan", "42", "");
        let result = resolver.resolve(&empty, &descriptor).await;

        assert!(matches!(result, Err(AppError::NoFileAssociated(_))));
        assert_eq!(spy.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_backend_resolves_to_presigned_url() {
        let client = ObjectStorageClient::new(&s3_config()).unwrap();
        let resolver = UrlResolver::new(
            Arc::new(FileStorage::Remote(client)),
            tokens_with(Arc::new(InMemoryTokenCache::new())),
            None,
        );

        // Signing is local; no MinIO needs to be running for this
        let url = resolver
            .resolve(&file(), &FieldDescriptor::new("reports"))
            .await
            .unwrap();
        assert!(url.contains("reports/42/a.pdf"));
        assert!(url.contains("X-Amz-Expires=60"));
    }

    #[tokio::test]
    async fn test_presign_failure_degrades_to_gated_url() {
        let client = ObjectStorageClient::new(&s3_config()).unwrap();
        // 1_000_000 s is past the sig-v4 maximum, so signing always fails
        let resolver = UrlResolver::new(
            Arc::new(FileStorage::Remote(client)),
            tokens_with(Arc::new(InMemoryTokenCache::new())),
            Some(1_000_000),
        );

        let url = resolver
            .resolve(&file(), &FieldDescriptor::new("reports"))
            .await
            .unwrap();
        assert_eq!(url, "/documents/report/scan/42/a.pdf");
    }
}
