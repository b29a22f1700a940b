//! Mapping source loading: YAML documents merged left-to-right, last wins.
//!
//! Document shape (top-level map keyed by resource type):
//!
//! ```yaml
//! aws_s3_bucket:
//!   service: s3
//!   description: S3 bucket lifecycle
//!   actions:
//!     create: ["s3:CreateBucket"]
//!     read: s3:GetBucketLocation
//!   attribute_actions:
//!     versioning: ["s3:PutBucketVersioning"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use iamgen_core::{IamGenError, PermissionSet, Result};
use serde::Deserialize;
use tracing::debug;

use crate::types::ResourcePermissionMapping;

/// One place mappings can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// Every `*.yaml` / `*.yml` file in the directory, in path order.
    Directory(PathBuf),
    /// A single YAML file.
    File(PathBuf),
    /// In-memory YAML content; `name` is used in error messages.
    Inline { name: String, content: String },
}

impl MappingSource {
    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Either a single permission or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionList {
    One(String),
    Many(Vec<String>),
}

impl ActionList {
    fn into_set(self, source_name: &str, context: &str) -> Result<PermissionSet> {
        let items = match self {
            ActionList::One(action) => vec![action],
            ActionList::Many(actions) => actions,
        };
        let mut set = PermissionSet::new();
        for action in items {
            let action = action.trim();
            if action.is_empty() {
                return Err(IamGenError::parse(
                    source_name,
                    format!("empty permission in {context}"),
                ));
            }
            set.add(action);
        }
        Ok(set)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMapping {
    #[serde(default)]
    service: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    actions: BTreeMap<String, ActionList>,
    #[serde(default)]
    attribute_actions: BTreeMap<String, ActionList>,
}

/// Parse one YAML document into mappings keyed by resource type.
///
/// Fails fast: the first malformed record rejects the whole document.
pub fn parse_mapping_document(
    source_name: &str,
    content: &str,
) -> Result<BTreeMap<String, ResourcePermissionMapping>> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, RawMapping> = serde_yaml::from_str(content)
        .map_err(|e| IamGenError::parse(source_name, e))?;

    let mut mappings = BTreeMap::new();
    for (resource_type, raw) in raw {
        if resource_type.trim().is_empty() {
            return Err(IamGenError::parse(source_name, "empty resource type key"));
        }

        let mut mapping = ResourcePermissionMapping::new(&resource_type, raw.service)
            .with_description(raw.description);

        for (label, actions) in raw.actions {
            let context = format!("{resource_type}.actions.{label}");
            mapping
                .base_permissions
                .insert(label, actions.into_set(source_name, &context)?);
        }
        for (attr, actions) in raw.attribute_actions {
            let context = format!("{resource_type}.attribute_actions.{attr}");
            mapping
                .attribute_permissions
                .insert(attr, actions.into_set(source_name, &context)?);
        }

        mappings.insert(resource_type, mapping);
    }

    Ok(mappings)
}

/// Collects mapping sources in precedence order and merges them.
///
/// Sources are applied left-to-right: a later source's entry for a resource
/// type replaces an earlier one wholesale.
#[derive(Debug, Default, Clone)]
pub struct KnowledgeBaseBuilder {
    sources: Vec<MappingSource>,
}

impl KnowledgeBaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: MappingSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = MappingSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Read and merge every source. Nothing is returned unless all succeed.
    pub fn build(&self) -> Result<BTreeMap<String, ResourcePermissionMapping>> {
        let mut merged = BTreeMap::new();
        for source in &self.sources {
            for (name, content) in read_source(source)? {
                let parsed = parse_mapping_document(&name, &content)?;
                debug!(source = %name, mappings = parsed.len(), "Parsed mapping source");
                merged.extend(parsed);
            }
        }
        Ok(merged)
    }
}

/// Resolve a source into `(name, content)` documents in application order.
fn read_source(source: &MappingSource) -> Result<Vec<(String, String)>> {
    match source {
        MappingSource::Inline { name, content } => Ok(vec![(name.clone(), content.clone())]),
        MappingSource::File(path) => Ok(vec![read_file(path)?]),
        MappingSource::Directory(dir) => {
            let files = list_mapping_files(dir)?;
            files.iter().map(|path| read_file(path)).collect()
        }
    }
}

fn read_file(path: &Path) -> Result<(String, String)> {
    let name = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| IamGenError::load(&name, e))?;
    Ok((name, content))
}

/// All `*.yaml` / `*.yml` files directly inside `dir`, sorted by path.
fn list_mapping_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let display = dir.display().to_string();
    if !dir.is_dir() {
        return Err(IamGenError::load(
            &display,
            "mappings directory not found",
        ));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| IamGenError::load(&display, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(IamGenError::load(&display, "no mapping files found"));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const S3: &str = r#"
aws_s3_bucket:
  service: s3
  description: S3 bucket
  actions:
    create: ["s3:CreateBucket", "s3:GetBucketLocation"]
    delete: s3:DeleteBucket
  attribute_actions:
    versioning: ["s3:PutBucketVersioning"]
"#;

    #[test]
    fn test_parse_document() {
        let mappings = parse_mapping_document("s3.yaml", S3).unwrap();
        let bucket = &mappings["aws_s3_bucket"];
        assert_eq!(bucket.service, "s3");
        assert_eq!(bucket.description, "S3 bucket");
        assert_eq!(bucket.all_base_permissions().len(), 3);
        assert!(bucket.base_permissions["delete"].contains("s3:DeleteBucket"));
        assert!(bucket.attribute_permissions["versioning"].contains("s3:PutBucketVersioning"));
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_mapping_document("empty.yaml", "  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_mapping_document("bad.yaml", "aws_vpc:\n  actions: 42\n").unwrap_err();
        assert!(matches!(err, IamGenError::Parse { .. }));

        let err = parse_mapping_document("bad.yaml", "aws_vpc:\n  servce: ec2\n").unwrap_err();
        assert!(matches!(err, IamGenError::Parse { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_permission() {
        let err = parse_mapping_document(
            "bad.yaml",
            "aws_vpc:\n  actions:\n    create: [\"ec2:CreateVpc\", \"\"]\n",
        )
        .unwrap_err();
        match err {
            IamGenError::Parse { message, .. } => assert!(message.contains("aws_vpc.actions.create")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_last_source_wins() {
        let first = MappingSource::inline(
            "first",
            "aws_vpc:\n  service: ec2\n  actions:\n    create: [\"ec2:CreateVpc\"]\n",
        );
        let second = MappingSource::inline(
            "second",
            "aws_vpc:\n  service: ec2\n  actions:\n    create: [\"ec2:CreateVpc\", \"ec2:DescribeVpcs\"]\n",
        );

        let merged = KnowledgeBaseBuilder::new()
            .source(first.clone())
            .source(second.clone())
            .build()
            .unwrap();
        assert_eq!(merged["aws_vpc"].all_base_permissions().len(), 2);

        let merged = KnowledgeBaseBuilder::new()
            .sources([second, first])
            .build()
            .unwrap();
        assert_eq!(merged["aws_vpc"].all_base_permissions().len(), 1);
    }

    #[test]
    fn test_directory_source_reads_yaml_and_yml_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "aws_vpc:\n  service: ec2\n  actions:\n    create: ec2:CreateVpc\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.yml"),
            "aws_vpc:\n  service: ec2\n  actions:\n    create: ec2:CreateVpcOverride\n",
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "not a mapping").unwrap();

        let merged = KnowledgeBaseBuilder::new()
            .source(MappingSource::Directory(dir.path().to_path_buf()))
            .build()
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged["aws_vpc"].all_base_permissions().contains("ec2:CreateVpcOverride"));
    }

    #[test]
    fn test_missing_directory_is_load_error() {
        let err = KnowledgeBaseBuilder::new()
            .source(MappingSource::Directory("/nonexistent/mappings".into()))
            .build()
            .unwrap_err();
        assert!(matches!(err, IamGenError::Load { .. }));
    }

    #[test]
    fn test_directory_without_yaml_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "nothing here").unwrap();
        let err = KnowledgeBaseBuilder::new()
            .source(MappingSource::Directory(dir.path().to_path_buf()))
            .build()
            .unwrap_err();
        assert!(matches!(err, IamGenError::Load { .. }));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = KnowledgeBaseBuilder::new()
            .source(MappingSource::File("/nonexistent/s3.yaml".into()))
            .build()
            .unwrap_err();
        assert!(matches!(err, IamGenError::Load { .. }));
    }
}
