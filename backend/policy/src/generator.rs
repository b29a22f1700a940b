//! Policy synthesis: resources in, sealed policy plus metadata out.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use iamgen_core::{IamGenError, PermissionSet, ResourceRecord, Result, WILDCARD};
use iamgen_mapping::{LookupService, ResolvedResourcePermissions};
use tracing::{debug, info};

use crate::builder::PolicyBuilder;
use crate::coverage::{self, CoverageReport};
use crate::hashing::content_hash;
use crate::types::{GenerationOptions, GroupBy, Policy, PolicyMetadata};
use crate::validator::{self, PolicyWarning};

/// `aws_s3_bucket` → `AwsS3Bucket`, `s3` → `S3`.
fn pascal_case(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Turns parsed resources into a policy document.
///
/// Permissions come from the shared [`LookupService`]; grouping, Sids and
/// resource scoping follow [`GenerationOptions`]. Every generated policy is
/// returned with its [`PolicyMetadata`], content hash included.
pub struct PolicyGenerator {
    lookup: Arc<LookupService>,
    options: GenerationOptions,
}

impl PolicyGenerator {
    pub fn new(lookup: Arc<LookupService>, options: GenerationOptions) -> Self {
        Self { lookup, options }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn lookup(&self) -> &Arc<LookupService> {
        &self.lookup
    }

    /// Generate a policy using the configured grouping.
    ///
    /// `None` is rejected with [`IamGenError::EmptyInput`]; an empty slice
    /// yields a policy with no statements.
    pub fn generate_policy(&self, resources: Option<&[ResourceRecord]>) -> Result<(Policy, PolicyMetadata)> {
        let resources = resources.ok_or(IamGenError::EmptyInput)?;
        let resolved = self.resolve_all(resources);
        let all = LookupService::combine(resolved.values());

        let mut builder = PolicyBuilder::new();
        match self.options.group_by {
            GroupBy::Flat => {
                let scope = self.flat_scope(&resolved);
                let sid = self.sid(|| "AllResourcesPermissions".to_string());
                builder.add_allow(sid, all.iter(), scope);
            }
            GroupBy::Service => {
                for (service, permissions) in LookupService::group_by_service(&all) {
                    let sid = self.sid(|| format!("{}Permissions", pascal_case(&service)));
                    builder.add_allow(sid, permissions, [WILDCARD]);
                }
            }
            GroupBy::Resource => {
                self.add_resource_statements(&mut builder, &resolved, &self.options.resource_arns);
            }
        }

        self.seal(builder, resources.len(), &all)
    }

    /// One statement per mapped resource type, scoped to `arn_overrides`
    /// where present and `"*"` elsewhere.
    pub fn generate_policy_with_resource_scopes(
        &self,
        resources: Option<&[ResourceRecord]>,
        arn_overrides: &BTreeMap<String, String>,
    ) -> Result<(Policy, PolicyMetadata)> {
        let resources = resources.ok_or(IamGenError::EmptyInput)?;
        let resolved = self.resolve_all(resources);
        let all = LookupService::combine(resolved.values());

        let mut builder = PolicyBuilder::new();
        self.add_resource_statements(&mut builder, &resolved, arn_overrides);
        self.seal(builder, resources.len(), &all)
    }

    pub fn analyze_gaps(&self, resources: &[ResourceRecord]) -> Vec<String> {
        coverage::analyze_gaps(self.lookup.knowledge_base(), resources)
    }

    pub fn coverage(&self, resources: &[ResourceRecord]) -> CoverageReport {
        coverage::compute_coverage(self.lookup.knowledge_base(), resources)
    }

    /// Lint a policy under this generator's wildcard-resource setting.
    pub fn validate_policy(&self, policy: Option<&Policy>) -> Result<Vec<PolicyWarning>> {
        validator::validate(policy, self.options.use_wildcard_resources)
    }

    fn resolve_all(&self, resources: &[ResourceRecord]) -> BTreeMap<String, ResolvedResourcePermissions> {
        for record in resources {
            if !self.lookup.knowledge_base().has(&record.resource_type) {
                debug!(resource = %record.full_name(), "Skipping unmapped resource");
            }
        }
        self.lookup.resolve_many(resources)
    }

    fn add_resource_statements(
        &self,
        builder: &mut PolicyBuilder,
        resolved: &BTreeMap<String, ResolvedResourcePermissions>,
        arn_overrides: &BTreeMap<String, String>,
    ) {
        for (resource_type, entry) in resolved {
            let scope = arn_overrides
                .get(resource_type)
                .map(String::as_str)
                .unwrap_or(WILDCARD);
            let sid = self.sid(|| format!("{}Access", pascal_case(resource_type)));
            builder.add_allow(sid, entry.permissions.iter(), [scope]);
        }
    }

    fn flat_scope(&self, resolved: &BTreeMap<String, ResolvedResourcePermissions>) -> BTreeSet<String> {
        if self.options.resource_arns.is_empty() || resolved.is_empty() {
            return BTreeSet::from([WILDCARD.to_string()]);
        }
        resolved
            .keys()
            .map(|t| {
                self.options
                    .resource_arns
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| WILDCARD.to_string())
            })
            .collect()
    }

    fn sid(&self, make: impl FnOnce() -> String) -> Option<String> {
        self.options.include_sids.then(make)
    }

    fn seal(&self, builder: PolicyBuilder, resource_count: usize, all: &PermissionSet) -> Result<(Policy, PolicyMetadata)> {
        let policy = builder.build();
        let metadata = PolicyMetadata {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            resource_count,
            permission_count: all.len(),
            services: policy.services(),
            content_hash: content_hash(&policy)?,
        };
        info!(
            group_by = %self.options.group_by,
            statements = policy.statements().len(),
            permissions = metadata.permission_count,
            resources = resource_count,
            "Generated policy"
        );
        Ok((policy, metadata))
    }
}
