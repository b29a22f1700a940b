use std::collections::BTreeMap;

use iamgen_core::PermissionSet;
use serde::{Deserialize, Serialize};

/// Everything the knowledge base knows about one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermissionMapping {
    pub resource_type: String,
    /// Service namespace (e.g. "s3", "ec2")
    pub service: String,
    /// Operation label (create/read/update/delete/...) -> permissions.
    /// Labels are organizational only.
    pub base_permissions: BTreeMap<String, PermissionSet>,
    /// Attribute name -> permissions needed when that attribute is declared.
    pub attribute_permissions: BTreeMap<String, PermissionSet>,
    pub description: String,
}

impl ResourcePermissionMapping {
    pub fn new(resource_type: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_base<I, S>(mut self, label: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_permissions
            .entry(label.into())
            .or_default()
            .extend(permissions);
        self
    }

    pub fn with_attribute<I, S>(mut self, attribute: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_permissions
            .entry(attribute.into())
            .or_default()
            .extend(permissions);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Union of every base permission set, regardless of label.
    pub fn all_base_permissions(&self) -> PermissionSet {
        let mut all = PermissionSet::new();
        for set in self.base_permissions.values() {
            all.add_all(set);
        }
        all
    }

    /// Number of permission entries across all base labels (duplicates across labels counted).
    pub fn base_action_count(&self) -> usize {
        self.base_permissions.values().map(PermissionSet::len).sum()
    }

    pub fn attribute_action_count(&self) -> usize {
        self.attribute_permissions.values().map(PermissionSet::len).sum()
    }
}

/// Result of resolving one resource declaration against the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResourcePermissions {
    pub resource_type: String,
    pub service: String,
    pub permissions: PermissionSet,
    /// Why these permissions are needed.
    pub explanation: String,
}

/// Per-type summary of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingInfo {
    pub resource_type: String,
    pub service: String,
    pub description: String,
    pub base_action_count: usize,
    pub attribute_names: Vec<String>,
    pub attribute_action_count: usize,
    pub total_possible_actions: usize,
}

impl From<&ResourcePermissionMapping> for MappingInfo {
    fn from(mapping: &ResourcePermissionMapping) -> Self {
        let base_action_count = mapping.base_action_count();
        let attribute_action_count = mapping.attribute_action_count();
        Self {
            resource_type: mapping.resource_type.clone(),
            service: mapping.service.clone(),
            description: mapping.description.clone(),
            base_action_count,
            // BTreeMap keys are already sorted.
            attribute_names: mapping.attribute_permissions.keys().cloned().collect(),
            attribute_action_count,
            total_possible_actions: base_action_count + attribute_action_count,
        }
    }
}

/// Knowledge-base-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseStats {
    pub total_mappings: usize,
    pub total_actions: usize,
    /// service -> number of resource types mapped to it
    pub services: BTreeMap<String, usize>,
    pub service_list: Vec<String>,
}
