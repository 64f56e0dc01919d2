//! Memoization of expensive computations over a persistent [`CacheStore`].
//!
//! ```text
//! memoize(ns, args, compute)
//!      │
//!      ├─► store.get(key) ── hit ──► decode, return
//!      │
//!      ├─► per-key lock (concurrent callers in this process wait here)
//!      │        └─► store.get(key) again ── hit ──► decode, return
//!      │
//!      └─► compute() ─► encode ─► store.put(key)   (first writer wins)
//! ```
//!
//! Values are stored with bincode, so non-finite floats (masked pixels come
//! back as NaN) read back exactly as they were written.
//!
//! Callers in other processes are not coordinated: they may compute the same
//! key concurrently, and whichever value reaches the store first is the one
//! every later caller sees.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use climate_common::{ClimateError, ClimateResult};

use crate::key::{CacheArgs, CacheKey};
use crate::store::CacheStore;

/// Snapshot of memoization counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries this process created in the store.
    pub stores: u64,
}

impl MemoStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

/// At-most-once execution of named computations.
pub struct MemoCache {
    store: Arc<dyn CacheStore>,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    counters: Counters,
}

impl MemoCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
        }
    }

    /// Whether `namespace(args)` has already been computed.
    pub async fn contains(&self, namespace: &str, args: &CacheArgs) -> ClimateResult<bool> {
        self.store.contains(&CacheKey::new(namespace, args)).await
    }

    /// Return the stored result of `namespace(args)`, computing and storing
    /// it first if absent.
    ///
    /// Errors from `compute` are returned as-is and leave no entry.
    pub async fn memoize<T, F, Fut>(&self, namespace: &str, args: &CacheArgs, compute: F) -> ClimateResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClimateResult<T>>,
    {
        let key = CacheKey::new(namespace, args);

        if let Some(value) = self.lookup(&key).await? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.compute_locked(&key, compute).await
        };
        self.release(&key, &lock).await;

        result
    }

    async fn compute_locked<T, F, Fut>(&self, key: &CacheKey, compute: F) -> ClimateResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClimateResult<T>>,
    {
        // another task in this process may have finished while we waited
        if let Some(value) = self.lookup(key).await? {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit after waiting on in-flight computation");
            return Ok(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let value = compute().await?;

        let encoded = encode(&value)?;
        let size = encoded.len();
        let created = self.store.put(key, Bytes::from(encoded)).await?;

        if created {
            self.counters.stores.fetch_add(1, Ordering::Relaxed);
            info!(
                key = %key,
                bytes = size,
                duration_ms = start.elapsed().as_millis() as u64,
                "Computed and cached"
            );
            return Ok(value);
        }

        // lost the race to another process; the stored value is authoritative
        match self.lookup(key).await? {
            Some(stored) => Ok(stored),
            None => Ok(value),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> ClimateResult<Option<T>> {
        match self.store.get(key).await? {
            Some(bytes) => bincode::deserialize(&bytes).map(Some).map_err(|e| {
                ClimateError::Serialization(format!("corrupt cache entry {}: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.entry(key.clone()).or_default().clone()
    }

    async fn release(&self, key: &CacheKey, lock: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, lock)) {
            in_flight.remove(key);
        }
    }
}

fn encode<T: Serialize>(value: &T) -> ClimateResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| ClimateError::Serialization(format!("failed to encode value: {}", e)))
}
