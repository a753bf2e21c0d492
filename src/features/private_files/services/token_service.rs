use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::error::Result;
use crate::features::private_files::models::FileReference;
use crate::modules::cache::TokenCache;

/// Mints and consumes single-use access keys.
///
/// Keys are 32 hex characters from 128 random bits; the cache maps each key
/// to the file's token descriptor string for the configured TTL.
pub struct AccessTokenService {
    cache: Arc<dyn TokenCache>,
    ttl: Duration,
}

impl AccessTokenService {
    pub fn new(cache: Arc<dyn TokenCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Mint a fresh key for `file`. Cache-write failures propagate; a URL
    /// with an unrecorded key would never be servable.
    pub async fn mint(&self, file: &FileReference) -> Result<String> {
        let key = generate_key();
        self.cache
            .set(&key, &file.token_descriptor(), self.ttl)
            .await?;

        debug!("Minted single-use access key for {}", file.token_descriptor());
        Ok(key)
    }

    /// Consume a key, returning its descriptor string when it was present
    /// and unexpired. The entry is gone afterwards either way.
    pub async fn consume(&self, key: &str) -> Result<Option<String>> {
        self.cache.take(key).await
    }
}

fn generate_key() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::cache::InMemoryTokenCache;
    use crate::shared::validation::ACCESS_KEY_REGEX;

    fn service() -> AccessTokenService {
        AccessTokenService::new(
            Arc::new(InMemoryTokenCache::new()),
            Duration::from_secs(3600),
        )
    }

    fn file() -> FileReference {
        FileReference::test_fixture("documents", "report", "scan", "42", "reports/42/a.pdf")
    }

    #[test]
    fn test_generated_keys_are_32_hex_chars() {
        for _ in 0..100 {
            assert!(ACCESS_KEY_REGEX.is_match(&generate_key()));
        }
    }

    #[tokio::test]
    async fn test_mint_records_the_descriptor_string() {
        let service = service();
        let key = service.mint(&file()).await.unwrap();

        let value = service.consume(&key).await.unwrap();
        assert_eq!(value.as_deref(), Some("documents-report-scan-42-a.pdf"));
    }

    #[tokio::test]
    async fn test_each_mint_produces_a_distinct_key() {
        let service = service();
        let a = service.mint(&file()).await.unwrap();
        let b = service.mint(&file()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let service = service();
        let key = service.mint(&file()).await.unwrap();

        assert!(service.consume(&key).await.unwrap().is_some());
        assert!(service.consume(&key).await.unwrap().is_none());
    }
}
