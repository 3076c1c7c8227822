//! Invalidation plans.
//!
//! Callers accumulate the keys a mutation makes stale, plus entity ids whose
//! every embedding key must be purged. The full-tree key is always part of
//! the rendered set.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::keys::CacheKey;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: BTreeSet<CacheKey>,
    wildcard_ids: BTreeSet<Uuid>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(keys: impl IntoIterator<Item = CacheKey>) -> Self {
        let mut plan = Self::new();
        plan.extend(keys);
        plan
    }

    pub fn add(&mut self, key: CacheKey) -> &mut Self {
        self.keys.insert(key);
        self
    }

    pub fn extend(&mut self, keys: impl IntoIterator<Item = CacheKey>) -> &mut Self {
        self.keys.extend(keys);
        self
    }

    /// Also purge every key that embeds `id`.
    pub fn purge_embedding(&mut self, id: Uuid) -> &mut Self {
        self.wildcard_ids.insert(id);
        self
    }

    pub fn with_purge(mut self, id: Uuid) -> Self {
        self.purge_embedding(id);
        self
    }

    pub fn merge(&mut self, other: InvalidationPlan) -> &mut Self {
        self.keys.extend(other.keys);
        self.wildcard_ids.extend(other.wildcard_ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.wildcard_ids.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.keys.iter()
    }

    pub fn wildcard_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.wildcard_ids.iter()
    }

    /// Explicit keys in rendered form, full-tree key included.
    pub fn rendered_keys(&self) -> BTreeSet<String> {
        self.keys
            .iter()
            .chain(std::iter::once(&CacheKey::FullTree))
            .map(CacheKey::render)
            .collect()
    }
}
