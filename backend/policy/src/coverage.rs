//! How much of an input set the knowledge base can explain.

use std::collections::{BTreeMap, BTreeSet};

use iamgen_core::ResourceRecord;
use iamgen_mapping::KnowledgeBase;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub total_distinct_types: usize,
    pub mapped_types: usize,
    pub coverage_percent: f64,
    /// Number of records per resource type, mapped or not.
    pub counts_by_type: BTreeMap<String, usize>,
    pub unmapped_types: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.unmapped_types.is_empty()
    }
}

/// Sorted, deduplicated resource types with no mapping.
pub fn analyze_gaps(kb: &KnowledgeBase, resources: &[ResourceRecord]) -> Vec<String> {
    resources
        .iter()
        .map(|r| r.resource_type.as_str())
        .filter(|t| !kb.has(t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn compute_coverage(kb: &KnowledgeBase, resources: &[ResourceRecord]) -> CoverageReport {
    let mut counts_by_type = BTreeMap::new();
    for record in resources {
        *counts_by_type.entry(record.resource_type.clone()).or_insert(0) += 1;
    }

    let unmapped_types: Vec<String> = counts_by_type
        .keys()
        .filter(|t| !kb.has(t))
        .cloned()
        .collect();
    let total_distinct_types = counts_by_type.len();
    let mapped_types = total_distinct_types - unmapped_types.len();
    let coverage_percent = if total_distinct_types == 0 {
        0.0
    } else {
        mapped_types as f64 / total_distinct_types as f64 * 100.0
    };

    CoverageReport {
        total_distinct_types,
        mapped_types,
        coverage_percent,
        counts_by_type,
        unmapped_types,
    }
}
