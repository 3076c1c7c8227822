//! Key/value store contract behind the cache service, and the in-process
//! implementation used when no remote cache is configured.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl CacheStoreError {
    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

/// Remote key/value cache operations.
///
/// Patterns use glob syntax: `*` matches any run of characters and `?`
/// matches exactly one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>;
    /// Fetch several keys in one round trip, preserving order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheStoreError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheStoreError>;
    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheStoreError>;
    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError>;
    async fn flush_all(&self) -> Result<(), CacheStoreError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process store with per-entry expiry.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "contains")
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        let now = Instant::now();
        let guard = rw_read(&self.entries, SOURCE, "get");
        Ok(guard
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheStoreError> {
        let now = Instant::now();
        let guard = rw_read(&self.entries, SOURCE, "get_many");
        Ok(keys
            .iter()
            .map(|key| {
                guard
                    .get(key)
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheStoreError> {
        let now = Instant::now();
        let mut guard = rw_write(&self.entries, SOURCE, "set");
        guard.retain(|_, entry| entry.is_live(now));
        guard.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheStoreError> {
        let mut guard = rw_write(&self.entries, SOURCE, "delete_many");
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        let now = Instant::now();
        let guard = rw_read(&self.entries, SOURCE, "keys_by_pattern");
        let mut keys: Vec<String> = guard
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<(), CacheStoreError> {
        rw_write(&self.entries, SOURCE, "flush_all").clear();
        Ok(())
    }
}

/// Glob match supporting `*` and `?`.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some('?') => {
                p += 1;
                c += 1;
            }
            Some(&ch) if ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star_p, star_c)) => {
                    p = star_p + 1;
                    c = star_c + 1;
                    backtrack = Some((star_p, star_c + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&ch| ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_handles_wildcards() {
        assert!(glob_match("*", ""));
        assert!(glob_match("discount:*", "discount:abc"));
        assert!(!glob_match("discount:*", "menu:discount:abc"));
        assert!(glob_match("*abc*", "menu:abc:submenu"));
        assert!(glob_match("*abc*", "abc"));
        assert!(!glob_match("*abc*", "ab:c"));
        assert!(glob_match("menu:?", "menu:1"));
        assert!(!glob_match("menu:?", "menu:12"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = MemoryCacheStore::new();
        store
            .set("gone", b"1".to_vec(), Duration::ZERO)
            .await
            .expect("set");
        store
            .set("kept", b"2".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");

        assert_eq!(store.get("gone").await.expect("get"), None);
        assert_eq!(store.get("kept").await.expect("get"), Some(b"2".to_vec()));
        assert_eq!(
            store.keys_by_pattern("*").await.expect("scan"),
            vec!["kept".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_many_and_flush() {
        let store = MemoryCacheStore::new();
        for key in ["a", "b", "c"] {
            store
                .set(key, key.as_bytes().to_vec(), Duration::from_secs(60))
                .await
                .expect("set");
        }

        store
            .delete_many(&["a".to_string(), "missing".to_string()])
            .await
            .expect("delete");
        assert!(!store.contains("a"));
        assert_eq!(store.len(), 2);

        store.flush_all().await.expect("flush");
        assert!(store.is_empty());
    }
}
