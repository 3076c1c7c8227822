//! Cache consistency layer.
//!
//! - **Store**: key/value contract over the remote cache, with an in-process
//!   implementation for single-node runs and tests.
//! - **Service**: typed read-through helpers, discount overlay lookups and
//!   plan-driven invalidation.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! redis_url = "redis://127.0.0.1:6379/0"
//! default_ttl_seconds = 300
//! discount_ttl_seconds = 3600
//! ```

pub mod codec;
mod config;
mod keys;
mod lock;
mod planner;
mod service;
mod store;

pub use config::CacheConfig;
pub use keys::{
    CacheKey, FULL_TREE_KEY, MENU_LIST_KEY, discount_pattern, embedding_pattern,
    parse_discount_key,
};
pub use planner::InvalidationPlan;
pub use service::CacheService;
pub use store::{CacheStore, CacheStoreError, MemoryCacheStore, glob_match};
