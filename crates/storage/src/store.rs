//! The persistent store behind [`crate::MemoCache`].

use async_trait::async_trait;
use bytes::Bytes;

use climate_common::ClimateResult;

use crate::key::CacheKey;

/// Append-only key/value store shared by every worker.
///
/// Entries are never evicted or overwritten. When two writers race on the
/// same key the first write wins and later writes are discarded.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend label for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &CacheKey) -> ClimateResult<Option<Bytes>>;

    /// Store `value` unless the key already exists.
    ///
    /// Returns `true` if this call created the entry.
    async fn put(&self, key: &CacheKey, value: Bytes) -> ClimateResult<bool>;

    async fn contains(&self, key: &CacheKey) -> ClimateResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
