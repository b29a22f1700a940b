//! Memoized resolution results, owned by a single lookup service.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::types::ResolvedResourcePermissions;

/// `(resource type, sorted attribute names, knowledge base generation)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource_type: String,
    pub attributes: Vec<String>,
    pub generation: u64,
}

impl CacheKey {
    pub fn new<I, S>(resource_type: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        attributes.sort();
        attributes.dedup();
        Self {
            resource_type: resource_type.to_string(),
            attributes,
            generation: 0,
        }
    }

    /// Tie the key to a knowledge base generation so reloads miss old entries.
    pub fn at_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

/// Thread-safe resolution cache.
///
/// Entries are inserted whole under the write lock, so readers never observe
/// a partially written result.
#[derive(Debug, Default)]
pub struct PermissionCache {
    entries: RwLock<HashMap<CacheKey, ResolvedResourcePermissions>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<ResolvedResourcePermissions> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store a result. If a concurrent caller got there first, the existing entry is kept.
    pub fn insert(&self, key: CacheKey, value: ResolvedResourcePermissions) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(value);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
