//! Primary store adapter backed by Redis.

use std::time::Duration;

use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use serde_json::Value;

use crate::config::CacheConfig;
use crate::error::StoreError;

/// Networked primary store.
///
/// Values are serialized to canonical JSON text before transmission and
/// decoded on read. Writes with a TTL use the store's native expiring
/// `SET`, so expiry is enforced server-side.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    scan_batch: usize,
}

impl RedisStore {
    /// Connect to the store at `url`.
    ///
    /// Builds the connection pool and probes one connection with a PING,
    /// so an unreachable host or misconfigured URL fails here instead of
    /// on first use.
    pub async fn connect(url: &str, config: &CacheConfig) -> Result<Self, StoreError> {
        let mut pool_config = deadpool_redis::Config::from_url(url);
        let mut sizing = PoolConfig::new(config.pool_size);
        sizing.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
        sizing.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
        sizing.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
        pool_config.pool = Some(sizing);

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;

        Ok(Self {
            pool,
            scan_batch: config.scan_batch,
        })
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
                StoreError::Decode {
                    key: key.to_string(),
                    source: e,
                }
            }),
            None => Ok(None),
        }
    }

    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            source: e,
        })?;

        let mut conn = self.pool.get().await?;
        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, payload, ttl).await?,
            None => conn.set::<_, _, ()>(key, payload).await?,
        }
        Ok(())
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    /// Collect keys matching `prefix*` via cursor iteration.
    ///
    /// One SCAN round trip per batch of `scan_batch` keys, so sweeping a
    /// large keyspace never occupies the connection for more than one
    /// batch at a time.
    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{prefix}*");
        let mut conn = self.pool.get().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(self.scan_batch)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}
