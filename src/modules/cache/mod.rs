//! Ephemeral key-value cache for single-use access tokens
//!
//! The cache is injected into the token service as a trait object so the
//! resolver stays testable in isolation; the in-memory implementation is the
//! process-wide default.

mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::AppError;

pub use memory::InMemoryTokenCache;

/// Shared ephemeral store with per-entry TTL.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Store `value` under `key` for at most `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;

    /// Atomically remove and return the value under `key`, if present and
    /// not yet expired. A second take of the same key returns `None`.
    async fn take(&self, key: &str) -> Result<Option<String>, AppError>;
}
