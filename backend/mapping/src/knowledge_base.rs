//! The permission knowledge base: resource type → mapping, read-mostly.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use iamgen_core::Result;
use tracing::info;

use crate::loader::{KnowledgeBaseBuilder, MappingSource};
use crate::types::{KnowledgeBaseStats, ResourcePermissionMapping};

#[derive(Debug, Default)]
struct State {
    mappings: HashMap<String, Arc<ResourcePermissionMapping>>,
    loaded: bool,
    generation: u64,
}

/// Thread-safe store of resource-type mappings.
///
/// One writer at load time, many readers afterwards. Share it with `Arc`.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    state: RwLock<State>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a loaded knowledge base from in-memory mappings.
    pub fn from_mappings(mappings: impl IntoIterator<Item = ResourcePermissionMapping>) -> Self {
        let kb = Self::new();
        kb.apply(
            mappings
                .into_iter()
                .map(|m| (m.resource_type.clone(), m))
                .collect(),
        );
        kb
    }

    /// Load ordered sources, merging left-to-right over any existing entries.
    ///
    /// Sources are fully parsed before the write lock is taken; on error the
    /// knowledge base is left untouched. Returns the number of mappings read.
    pub fn load(&self, sources: impl IntoIterator<Item = MappingSource>) -> Result<usize> {
        let merged = KnowledgeBaseBuilder::new().sources(sources).build()?;
        let count = merged.len();
        self.apply(merged);

        let stats = self.stats();
        info!(
            loaded = count,
            total = stats.total_mappings,
            services = stats.service_list.len(),
            "Loaded permission mappings"
        );
        Ok(count)
    }

    /// Convenience for the common single-directory case.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        self.load([MappingSource::Directory(dir.as_ref().to_path_buf())])
    }

    fn apply(&self, merged: BTreeMap<String, ResourcePermissionMapping>) {
        let mut state = self.write();
        for (resource_type, mapping) in merged {
            state.mappings.insert(resource_type, Arc::new(mapping));
        }
        state.loaded = true;
        state.generation += 1;
    }

    pub fn get(&self, resource_type: &str) -> Option<Arc<ResourcePermissionMapping>> {
        self.read().mappings.get(resource_type).cloned()
    }

    /// Like [`get`](Self::get), paired with the generation it was read at.
    pub fn get_versioned(&self, resource_type: &str) -> (Option<Arc<ResourcePermissionMapping>>, u64) {
        let state = self.read();
        (state.mappings.get(resource_type).cloned(), state.generation)
    }

    /// Bumped by every successful load and by [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn has(&self, resource_type: &str) -> bool {
        self.read().mappings.contains_key(resource_type)
    }

    /// A detached copy of every mapping; mutating it never touches the knowledge base.
    pub fn all(&self) -> BTreeMap<String, ResourcePermissionMapping> {
        self.read()
            .mappings
            .iter()
            .map(|(k, v)| (k.clone(), ResourcePermissionMapping::clone(v)))
            .collect()
    }

    /// Reset to the empty, unloaded state.
    pub fn clear(&self) {
        let mut state = self.write();
        state.mappings.clear();
        state.loaded = false;
        state.generation += 1;
    }

    pub fn is_loaded(&self) -> bool {
        self.read().loaded
    }

    pub fn len(&self) -> usize {
        self.read().mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().mappings.is_empty()
    }

    /// Totals across all mappings, with services sorted.
    pub fn stats(&self) -> KnowledgeBaseStats {
        let state = self.read();
        let mut stats = KnowledgeBaseStats {
            total_mappings: state.mappings.len(),
            ..Default::default()
        };
        for mapping in state.mappings.values() {
            stats.total_actions += mapping.base_action_count();
            if !mapping.service.is_empty() {
                *stats.services.entry(mapping.service.clone()).or_insert(0) += 1;
            }
        }
        stats.service_list = stats.services.keys().cloned().collect();
        stats
    }

    // A panicking reader cannot leave the map half-written, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
