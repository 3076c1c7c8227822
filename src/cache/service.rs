//! Cache access for domain data.
//!
//! `CacheService` owns serialization and failure handling. Store errors are
//! logged and counted here and never reach callers: a failed read is a miss,
//! a failed write or delete is a no-op.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::codec::{decode, encode};
use super::config::CacheConfig;
use super::keys::{CacheKey, discount_pattern, embedding_pattern, parse_discount_key};
use super::planner::InvalidationPlan;
use super::store::CacheStore;

const SOURCE: &str = "cache::service";

#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read and decode `key`; any failure is reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.render();
        match self.store.get(&rendered).await {
            Ok(Some(bytes)) => self.decode_entry(&rendered, &bytes),
            Ok(None) => {
                counter!("menusync_cache_miss_total").increment(1);
                None
            }
            Err(err) => {
                record_error("get");
                error!(
                    target = SOURCE,
                    key = %rendered,
                    error = %err,
                    "cache read failed, falling back to repository"
                );
                None
            }
        }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &CacheKey, value: &T) {
        self.set_with_ttl(key, value, self.config.default_ttl).await;
    }

    pub async fn set_with_ttl<T: Serialize + Sync>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let rendered = key.render();
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                record_error("encode");
                error!(target = SOURCE, key = %rendered, error = %err, "cache encode failed");
                return;
            }
        };

        if let Err(err) = self.store.set(&rendered, bytes, ttl).await {
            record_error("set");
            error!(target = SOURCE, key = %rendered, error = %err, "cache write failed");
        }
    }

    /// Keys matching a glob pattern; empty when the store is unreachable.
    pub async fn keys_by_pattern(&self, pattern: &str) -> Vec<String> {
        match self.store.keys_by_pattern(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                record_error("keys_by_pattern");
                error!(target = SOURCE, pattern, error = %err, "cache key scan failed");
                Vec::new()
            }
        }
    }

    pub async fn get_discount(&self, dish_id: Uuid) -> Option<Decimal> {
        self.get(&CacheKey::discount(dish_id)).await
    }

    /// Every discount overlay currently cached, keyed by dish id.
    ///
    /// One pattern scan plus one batched read regardless of how many
    /// discounts exist.
    pub async fn get_all_discounts(&self) -> HashMap<Uuid, Decimal> {
        let keys = self.keys_by_pattern(&discount_pattern()).await;
        if keys.is_empty() {
            return HashMap::new();
        }

        let values = match self.store.get_many(&keys).await {
            Ok(values) => values,
            Err(err) => {
                record_error("get_many");
                error!(target = SOURCE, error = %err, "discount batch read failed");
                return HashMap::new();
            }
        };

        keys.iter()
            .zip(values)
            .filter_map(|(key, value)| {
                let dish_id = parse_discount_key(key)?;
                let price = self.decode_entry::<Decimal>(key, &value?)?;
                Some((dish_id, price))
            })
            .collect()
    }

    pub async fn set_discount(&self, dish_id: Uuid, price: Decimal) {
        self.set_with_ttl(&CacheKey::discount(dish_id), &price, self.config.discount_ttl)
            .await;
    }

    /// Delete every key named by `plan`, the full-tree key, and every key
    /// embedding one of the plan's wildcard ids.
    ///
    /// Returns the keys a delete was issued for.
    pub async fn invalidate(&self, plan: &InvalidationPlan) -> BTreeSet<String> {
        let mut keys = plan.rendered_keys();
        for id in plan.wildcard_ids() {
            keys.extend(self.keys_by_pattern(&embedding_pattern(*id)).await);
        }

        let batch: Vec<String> = keys.iter().cloned().collect();
        match self.store.delete_many(&batch).await {
            Ok(()) => {
                counter!("menusync_cache_invalidated_keys_total").increment(batch.len() as u64);
                debug!(target = SOURCE, count = batch.len(), "cache keys invalidated");
            }
            Err(err) => {
                record_error("delete_many");
                error!(
                    target = SOURCE,
                    count = batch.len(),
                    error = %err,
                    "cache invalidation failed"
                );
            }
        }
        keys
    }

    pub async fn flush_all(&self) {
        if let Err(err) = self.store.flush_all().await {
            record_error("flush_all");
            error!(target = SOURCE, error = %err, "cache flush failed");
        }
    }

    fn decode_entry<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Option<T> {
        match decode(bytes) {
            Ok(value) => {
                counter!("menusync_cache_hit_total").increment(1);
                Some(value)
            }
            Err(err) => {
                record_error("decode");
                warn!(target = SOURCE, key, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }
}

fn record_error(op: &'static str) {
    counter!("menusync_cache_error_total", "op" => op).increment(1);
}
