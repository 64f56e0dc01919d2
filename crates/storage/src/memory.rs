//! In-memory store for tests and single-run computations.
//!
//! Nothing is persisted; entries live as long as the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use climate_common::ClimateResult;

use crate::key::CacheKey;
use crate::store::CacheStore;

/// Unbounded in-memory [`CacheStore`].
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, Bytes>>,
    rejected_writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Writes discarded because the key already existed.
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> ClimateResult<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> ClimateResult<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            self.rejected_writes.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }
        entries.insert(key.clone(), value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheArgs;

    #[tokio::test]
    async fn test_first_writer_wins() {
        let store = MemoryStore::new();
        let key = CacheKey::new("ns", &CacheArgs::new().arg("x", 1));

        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.put(&key, Bytes::from_static(b"first")).await.unwrap());
        assert!(!store.put(&key, Bytes::from_static(b"second")).await.unwrap());

        assert_eq!(store.get(&key).await.unwrap().unwrap(), Bytes::from_static(b"first"));
        assert_eq!(store.rejected_writes(), 1);
        assert_eq!(store.len().await, 1);
    }
}
