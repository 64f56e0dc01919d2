//! Redis-backed store for workers spread across hosts.

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, info};

use climate_common::{ClimateError, ClimateResult};

use crate::key::CacheKey;
use crate::store::CacheStore;

/// Key prefix for every entry written by this store.
pub const KEY_PREFIX: &str = "climate-agg";

/// Redis [`CacheStore`].
///
/// Entries are written with `SETNX` and no TTL, so they are permanent and
/// the first writer wins.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> ClimateResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| ClimateError::Cache(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ClimateError::Cache(format!("Redis connection failed: {}", e)))?;

        info!("Connected to Redis cache store");
        Ok(Self { conn })
    }

    /// Redis key for a cache key.
    pub fn redis_key(key: &CacheKey) -> String {
        format!("{}:{}", KEY_PREFIX, key)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> ClimateResult<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn
            .get(Self::redis_key(key))
            .await
            .map_err(|e| ClimateError::Cache(format!("Cache get failed: {}", e)))?;

        Ok(result.map(Bytes::from))
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> ClimateResult<bool> {
        let mut conn = self.conn.clone();
        let created: bool = conn
            .set_nx(Self::redis_key(key), value.as_ref())
            .await
            .map_err(|e| ClimateError::Cache(format!("Cache set failed: {}", e)))?;

        if !created {
            debug!(key = %key, "Entry already written by another worker");
        }
        Ok(created)
    }

    async fn contains(&self, key: &CacheKey) -> ClimateResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(Self::redis_key(key))
            .await
            .map_err(|e| ClimateError::Cache(format!("Cache exists check failed: {}", e)))?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheArgs;

    #[test]
    fn test_redis_key_format() {
        let key = CacheKey::new(
            "weather/precipitation_for_range",
            &CacheArgs::new().arg("start", "1990-01-01").arg("end", "1991-01-01"),
        );
        assert_eq!(
            RedisStore::redis_key(&key),
            r#"climate-agg:weather/precipitation_for_range:{"end":"1991-01-01","start":"1990-01-01"}"#
        );
    }
}
