//! Cache backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tracing::info;

use storage::{CacheStore, DiskStore, MemoryStore, RedisStore};

/// Where memoized results live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Files under `--cache-dir`, shared by workers on one host or mount.
    Disk,
    /// A Redis server shared by workers on any host.
    Redis,
    /// Process memory only. Nothing survives the run.
    Memory,
}

/// Settings needed to open a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: CacheBackend,
    pub cache_dir: PathBuf,
    pub redis_url: Option<String>,
}

/// Open the configured store.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Disk => Arc::new(
            DiskStore::open(&config.cache_dir)
                .await
                .with_context(|| format!("failed to open cache dir {}", config.cache_dir.display()))?,
        ),
        CacheBackend::Redis => {
            let Some(url) = config.redis_url.as_deref() else {
                bail!("--redis-url (or REDIS_URL) is required for the redis cache backend");
            };
            Arc::new(RedisStore::connect(url).await.context("failed to connect to Redis")?)
        }
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
    };

    info!(backend = store.name(), "Cache store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_redis_requires_url() {
        let config = StoreConfig {
            backend: CacheBackend::Redis,
            cache_dir: PathBuf::from("/unused"),
            redis_url: None,
        };
        assert!(open_store(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_open_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: CacheBackend::Disk,
            cache_dir: dir.path().join("cache"),
            redis_url: None,
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "disk");
        assert!(dir.path().join("cache").is_dir());
    }
}
