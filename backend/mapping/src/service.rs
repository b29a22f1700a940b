//! Lookup service: resource declaration → resolved permission set, memoized.

use std::collections::BTreeMap;
use std::sync::Arc;

use iamgen_core::{service_of, IamGenError, PermissionSet, ResourceRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheKey, PermissionCache};
use crate::knowledge_base::KnowledgeBase;
use crate::types::{MappingInfo, ResolvedResourcePermissions};

/// Which declared attributes trigger attribute-conditional permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    /// Any declared key triggers, whatever its value.
    #[default]
    Presence,
    /// `false`, `null`, `""`, `[]` and `{}` do not trigger.
    Truthy,
}

impl AttributeMode {
    fn triggers(self, value: &Value) -> bool {
        match self {
            AttributeMode::Presence => true,
            AttributeMode::Truthy => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                Value::Number(_) => true,
            },
        }
    }
}

/// Resolves resource declarations against a shared knowledge base.
///
/// Each instance owns its own cache; two services over the same knowledge
/// base never share memoized results. Cache keys carry the knowledge base
/// generation, so a reload of the shared knowledge base is seen on the next
/// lookup without calling [`clear_cache`](Self::clear_cache).
#[derive(Debug)]
pub struct LookupService {
    kb: Arc<KnowledgeBase>,
    cache: PermissionCache,
    attribute_mode: AttributeMode,
}

impl LookupService {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self {
            kb,
            cache: PermissionCache::new(),
            attribute_mode: AttributeMode::default(),
        }
    }

    pub fn with_attribute_mode(mut self, mode: AttributeMode) -> Self {
        self.attribute_mode = mode;
        self
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    pub fn attribute_mode(&self) -> AttributeMode {
        self.attribute_mode
    }

    /// Resolve a resource type given the names of its declared attributes.
    ///
    /// Only the presence of a name matters. Fails with
    /// [`IamGenError::UnmappedResource`] if the type is unknown.
    pub fn resolve<I, S>(&self, resource_type: &str, attribute_names: I) -> Result<ResolvedResourcePermissions>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (mapping, generation) = self.kb.get_versioned(resource_type);
        let Some(mapping) = mapping else {
            return Err(IamGenError::UnmappedResource(resource_type.to_string()));
        };

        let key = CacheKey::new(resource_type, attribute_names).at_generation(generation);
        if let Some(cached) = self.cache.get(&key) {
            debug!(resource_type, attributes = key.attributes.len(), "Permission cache hit");
            return Ok(cached);
        }

        let mut permissions = mapping.all_base_permissions();
        for attr in &key.attributes {
            if let Some(extra) = mapping.attribute_permissions.get(attr) {
                permissions.add_all(extra);
            }
        }

        let resolved = ResolvedResourcePermissions {
            resource_type: resource_type.to_string(),
            service: mapping.service.clone(),
            permissions,
            explanation: format!(
                "Mapped from resource type {} with {} attributes",
                resource_type,
                key.attributes.len()
            ),
        };
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve a parsed resource, honoring the configured [`AttributeMode`].
    pub fn resolve_record(&self, record: &ResourceRecord) -> Result<ResolvedResourcePermissions> {
        let mode = self.attribute_mode;
        let names = record
            .attributes
            .iter()
            .filter(|(_, value)| mode.triggers(value))
            .map(|(name, _)| name.as_str());
        self.resolve(&record.resource_type, names)
    }

    /// Best-effort batch resolution keyed by resource type.
    ///
    /// Unmapped types are skipped. Records sharing a type are merged.
    pub fn resolve_many(&self, resources: &[ResourceRecord]) -> BTreeMap<String, ResolvedResourcePermissions> {
        let mut result: BTreeMap<String, ResolvedResourcePermissions> = BTreeMap::new();
        for record in resources {
            let resolved = match self.resolve_record(record) {
                Ok(resolved) => resolved,
                Err(_) => continue,
            };
            match result.get_mut(&record.resource_type) {
                Some(existing) => existing.permissions.add_all(&resolved.permissions),
                None => {
                    result.insert(record.resource_type.clone(), resolved);
                }
            }
        }
        result
    }

    /// Union of several resolution results. Touches no cache.
    pub fn combine<'a>(resolved: impl IntoIterator<Item = &'a ResolvedResourcePermissions>) -> PermissionSet {
        let mut combined = PermissionSet::new();
        for r in resolved {
            combined.add_all(&r.permissions);
        }
        combined
    }

    /// Partition permissions by service prefix. Malformed entries are dropped.
    pub fn group_by_service(permissions: &PermissionSet) -> BTreeMap<String, PermissionSet> {
        let mut groups: BTreeMap<String, PermissionSet> = BTreeMap::new();
        for permission in permissions.iter() {
            if let Some(service) = service_of(permission) {
                groups.entry(service.to_string()).or_default().add(permission);
            }
        }
        groups
    }

    /// Types from `resource_types` that have no mapping, in input order.
    pub fn unmapped_types<'a>(&self, resource_types: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        resource_types
            .into_iter()
            .filter(|t| !self.kb.has(t))
            .map(str::to_string)
            .collect()
    }

    pub fn mapping_info(&self, resource_type: &str) -> Result<MappingInfo> {
        self.kb
            .get(resource_type)
            .map(|mapping| MappingInfo::from(mapping.as_ref()))
            .ok_or_else(|| IamGenError::UnmappedResource(resource_type.to_string()))
    }

    /// Drop memoized results. The knowledge base is unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MappingSource;
    use crate::types::ResourcePermissionMapping;
    use serde_json::json;
    use std::thread;

    fn kb() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::from_mappings([
            ResourcePermissionMapping::new("aws_s3_bucket", "s3")
                .with_base("create", ["s3:CreateBucket"])
                .with_base("read", ["s3:GetBucketLocation"])
                .with_attribute("logging", ["s3:PutBucketLogging"]),
            ResourcePermissionMapping::new("aws_instance", "ec2")
                .with_base("create", ["ec2:RunInstances", "ec2:DescribeInstances"]),
        ]))
    }

    #[test]
    fn test_attribute_triggered_permissions() {
        let svc = LookupService::new(kb());
        let bucket = ResourceRecord::new("aws_s3_bucket", "b");

        let with_logging = svc
            .resolve_record(&bucket.clone().with_attribute("logging", json!(true)))
            .unwrap();
        assert_eq!(with_logging.permissions.len(), 3);
        assert!(with_logging.permissions.contains("s3:PutBucketLogging"));

        let without = svc.resolve_record(&bucket).unwrap();
        assert_eq!(without.permissions.len(), 2);
        assert_eq!(without.service, "s3");
    }

    #[test]
    fn test_presence_mode_ignores_values() {
        let svc = LookupService::new(kb());
        let record = ResourceRecord::new("aws_s3_bucket", "b").with_attribute("logging", json!(false));
        assert_eq!(svc.resolve_record(&record).unwrap().permissions.len(), 3);
    }

    #[test]
    fn test_truthy_mode_skips_falsy_values() {
        let svc = LookupService::new(kb()).with_attribute_mode(AttributeMode::Truthy);
        let off = ResourceRecord::new("aws_s3_bucket", "b").with_attribute("logging", json!(false));
        let on = ResourceRecord::new("aws_s3_bucket", "b")
            .with_attribute("logging", json!({"target_bucket": "logs"}));
        assert_eq!(svc.resolve_record(&off).unwrap().permissions.len(), 2);
        assert_eq!(svc.resolve_record(&on).unwrap().permissions.len(), 3);
    }

    #[test]
    fn test_unmapped_type_is_error() {
        let svc = LookupService::new(kb());
        let err = svc.resolve("aws_unknown_thing", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, IamGenError::UnmappedResource(t) if t == "aws_unknown_thing"));
        assert_eq!(svc.cache_len(), 0);
    }

    #[test]
    fn test_cache_hits_are_equivalent() {
        let svc = LookupService::new(kb());
        let first = svc.resolve("aws_s3_bucket", ["logging", "acl"]).unwrap();
        let again = svc.resolve("aws_s3_bucket", ["acl", "logging"]).unwrap();
        assert_eq!(first, again);
        assert_eq!(svc.cache_len(), 1);

        for _ in 0..10 {
            let r = svc.resolve("aws_s3_bucket", ["logging", "acl"]).unwrap();
            assert_eq!(r.permissions, first.permissions);
        }
        assert_eq!(svc.cache_len(), 1);

        svc.clear_cache();
        assert_eq!(svc.cache_len(), 0);
        assert!(svc.knowledge_base().has("aws_s3_bucket"));
    }

    #[test]
    fn test_independent_services_have_independent_caches() {
        let shared = kb();
        let a = LookupService::new(Arc::clone(&shared));
        let b = LookupService::new(shared);
        a.resolve("aws_instance", Vec::<String>::new()).unwrap();
        assert_eq!(a.cache_len(), 1);
        assert_eq!(b.cache_len(), 0);
    }

    #[test]
    fn test_reload_of_shared_knowledge_base_is_seen() {
        let shared = kb();
        let svc = LookupService::new(Arc::clone(&shared));
        let before = svc.resolve("aws_instance", Vec::<String>::new()).unwrap();
        assert_eq!(before.permissions.len(), 2);

        shared
            .load([MappingSource::inline(
                "ec2",
                "aws_instance:\n  service: ec2\n  actions:\n    create:\n      - ec2:RunInstances\n      - ec2:CreateTags\n    delete: ec2:TerminateInstances\n",
            )])
            .unwrap();

        let after = svc.resolve("aws_instance", Vec::<String>::new()).unwrap();
        assert_eq!(after.permissions.len(), 3);
        assert!(after.permissions.contains("ec2:TerminateInstances"));
        assert!(!after.permissions.contains("ec2:DescribeInstances"));
    }

    #[test]
    fn test_resolve_many_skips_unmapped_and_merges_same_type() {
        let svc = LookupService::new(kb());
        let resources = vec![
            ResourceRecord::new("aws_s3_bucket", "plain"),
            ResourceRecord::new("aws_s3_bucket", "logged").with_attribute("logging", json!(true)),
            ResourceRecord::new("aws_instance", "web"),
            ResourceRecord::new("gcp_storage_bucket", "other"),
        ];
        let resolved = svc.resolve_many(&resources);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["aws_s3_bucket"].permissions.len(), 3);
        assert!(!resolved.contains_key("gcp_storage_bucket"));
    }

    #[test]
    fn test_combine_and_group_by_service() {
        let svc = LookupService::new(kb());
        let s3 = svc.resolve("aws_s3_bucket", Vec::<String>::new()).unwrap();
        let ec2 = svc.resolve("aws_instance", Vec::<String>::new()).unwrap();

        let ab = LookupService::combine([&s3, &ec2]);
        let ba = LookupService::combine([&ec2, &s3]);
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 4);

        let mut with_malformed = ab.clone();
        with_malformed.add("NoSeparator");
        let groups = LookupService::group_by_service(&with_malformed);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["ec2", "s3"]);
        assert_eq!(groups["s3"].len(), 2);
        assert_eq!(groups.values().map(PermissionSet::len).sum::<usize>(), 4);
    }

    #[test]
    fn test_unmapped_types_and_mapping_info() {
        let svc = LookupService::new(kb());
        assert_eq!(
            svc.unmapped_types(["aws_instance", "aws_mystery", "aws_s3_bucket"]),
            vec!["aws_mystery"]
        );

        let info = svc.mapping_info("aws_s3_bucket").unwrap();
        assert_eq!(info.attribute_names, vec!["logging"]);
        assert!(svc.mapping_info("aws_mystery").is_err());
    }

    #[test]
    fn test_concurrent_resolution_is_consistent() {
        let svc = Arc::new(LookupService::new(kb()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || {
                    let attrs: Vec<&str> = if i % 2 == 0 { vec!["logging"] } else { vec![] };
                    for _ in 0..100 {
                        let r = svc.resolve("aws_s3_bucket", attrs.clone()).unwrap();
                        assert_eq!(r.permissions.len(), if i % 2 == 0 { 3 } else { 2 });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(svc.cache_len(), 2);
    }
}
