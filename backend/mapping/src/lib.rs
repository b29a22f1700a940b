//! `iamgen-mapping`: the permission knowledge base and its lookup layer.
//!
//! Provides:
//! - Typed resource → permission mappings
//! - Ordered, last-wins loading of YAML mapping sources
//! - A thread-safe knowledge base (readers-writer discipline)
//! - A memoizing lookup service with per-instance cache

pub mod cache;
pub mod knowledge_base;
pub mod loader;
pub mod service;
pub mod types;

pub use cache::{CacheKey, PermissionCache};
pub use knowledge_base::KnowledgeBase;
pub use loader::{parse_mapping_document, KnowledgeBaseBuilder, MappingSource};
pub use service::{AttributeMode, LookupService};
pub use types::{
    KnowledgeBaseStats, MappingInfo, ResolvedResourcePermissions, ResourcePermissionMapping,
};
