use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::core::error::AppError;

use super::TokenCache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-wide in-memory token cache.
#[derive(Default)]
pub struct InMemoryTokenCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        // Drop expired entries while we hold the lock anyway
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut entries = self.entries.lock().await;
        match entries.remove(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_set_then_take() {
        let cache = InMemoryTokenCache::new();
        tokio_test::assert_ok!(
            cache
                .set("abc", "documents-report-scan-1-a.pdf", Duration::from_secs(60))
                .await
        );

        let value = cache.take("abc").await.unwrap();
        assert_eq!(value.as_deref(), Some("documents-report-scan-1-a.pdf"));
    }

    #[tokio::test]
    async fn test_take_consumes_the_entry() {
        let cache = InMemoryTokenCache::new();
        cache.set("abc", "v", Duration::from_secs(60)).await.unwrap();

        assert!(cache.take("abc").await.unwrap().is_some());
        assert!(cache.take("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let cache = InMemoryTokenCache::new();
        assert!(cache.take("missing").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = InMemoryTokenCache::new();
        cache.set("abc", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.take("abc").await.unwrap().is_none());
    }
}
