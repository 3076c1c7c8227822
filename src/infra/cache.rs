//! Redis-backed cache store.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{
    RedisConnectionManager,
    bb8::{Pool, PooledConnection},
    redis,
};
use tracing::info;

use crate::cache::{CacheStore, CacheStoreError};
use crate::config::CacheSettings;

use super::error::InfraError;

const SCAN_BATCH: usize = 500;
const DELETE_BATCH: usize = 500;

#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisCacheStore {
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    /// Build a pool for `url`. Connections are established lazily, so an
    /// unreachable server surfaces as per-command errors rather than here.
    pub fn connect(url: &str, settings: &CacheSettings) -> Result<Self, InfraError> {
        let manager = RedisConnectionManager::new(url)
            .map_err(|err| InfraError::cache(format!("invalid redis url: {err}")))?;
        let pool = Pool::builder()
            .max_size(settings.pool_size.get())
            .connection_timeout(Duration::from_secs(2))
            .build_unchecked(manager);

        info!(
            target = "infra::cache::connect",
            pool_size = settings.pool_size.get(),
            "redis cache pool created"
        );
        Ok(Self::new(pool))
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, CacheStoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheStoreError::Unavailable(err.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(|err| CacheStoreError::command("GET", err))?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheStoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut *conn)
            .await
            .map_err(|err| CacheStoreError::command("MGET", err))?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheStoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut *conn)
            .await
            .map_err(|err| CacheStoreError::command("SET", err))?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheStoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        for chunk in keys.chunks(DELETE_BATCH) {
            let _: i64 = redis::cmd("UNLINK")
                .arg(chunk)
                .query_async(&mut *conn)
                .await
                .map_err(|err| CacheStoreError::command("UNLINK", err))?;
        }
        Ok(())
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        let mut conn = self.connection().await?;
        // SCAN may report a key more than once across iterations.
        let mut found = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(|err| CacheStoreError::command("SCAN", err))?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(found.into_iter().collect())
    }

    async fn flush_all(&self) -> Result<(), CacheStoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHALL")
            .query_async(&mut *conn)
            .await
            .map_err(|err| CacheStoreError::command("FLUSHALL", err))?;
        Ok(())
    }
}
