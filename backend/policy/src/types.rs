use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use iamgen_core::{service_of, IamGenError, Result};
use serde::{Deserialize, Serialize};

/// Policy language version written into every document.
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One effect/action/resource triple.
///
/// Actions and resources are always sorted and deduplicated, whether the
/// statement was built in code or read from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StatementDocument")]
pub struct Statement {
    #[serde(rename = "Sid", skip_serializing_if = "Option::is_none")]
    sid: Option<String>,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Action")]
    action: Vec<String>,
    #[serde(rename = "Resource")]
    resource: Vec<String>,
}

impl Statement {
    pub fn new<A, R>(sid: Option<String>, effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid,
            effect,
            action: normalize(actions),
            resource: normalize(resources),
        }
    }

    pub fn allow<A, R>(sid: Option<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(sid, Effect::Allow, actions, resources)
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[String] {
        &self.action
    }

    pub fn resources(&self) -> &[String] {
        &self.resource
    }
}

fn normalize<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Policy documents in the wild may write `"Resource": "*"` instead of a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct StatementDocument {
    #[serde(rename = "Sid", default)]
    sid: Option<String>,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Action")]
    action: OneOrMany,
    #[serde(rename = "Resource")]
    resource: OneOrMany,
}

impl From<StatementDocument> for Statement {
    fn from(doc: StatementDocument) -> Self {
        Statement::new(
            doc.sid,
            doc.effect,
            Vec::<String>::from(doc.action),
            Vec::<String>::from(doc.resource),
        )
    }
}

/// A sealed policy document. Construct with [`crate::PolicyBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Statement")]
    statement: Vec<Statement>,
}

impl Policy {
    pub(crate) fn sealed(statements: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: statements,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statement
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Minified JSON; the input to [`crate::content_hash`].
    pub fn to_compact_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sorted, deduplicated service prefixes across all statements.
    pub fn services(&self) -> Vec<String> {
        self.statement
            .iter()
            .flat_map(|stmt| stmt.actions())
            .filter_map(|action| service_of(action))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Facts about a generated policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    /// RFC 3339, UTC
    pub generated_at: String,
    pub resource_count: usize,
    pub permission_count: usize,
    pub services: Vec<String>,
    /// Hex SHA-256 of the compact JSON, for change detection.
    pub content_hash: String,
}

/// How statements are partitioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// A single statement holding every permission.
    Flat,
    /// One statement per service namespace.
    #[default]
    Service,
    /// One statement per resource type, scoped to its ARN override.
    Resource,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupBy::Flat => "flat",
            GroupBy::Service => "service",
            GroupBy::Resource => "resource",
        };
        f.write_str(s)
    }
}

impl FromStr for GroupBy {
    type Err = IamGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(GroupBy::Flat),
            "service" => Ok(GroupBy::Service),
            "resource" => Ok(GroupBy::Resource),
            other => Err(IamGenError::Config(format!(
                "unknown group_by '{other}'. Use 'flat', 'service', or 'resource'"
            ))),
        }
    }
}

/// Knobs for policy generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub group_by: GroupBy,
    /// The caller intends `"*"` resource scopes; suppresses the matching warning.
    pub use_wildcard_resources: bool,
    pub include_sids: bool,
    /// Resource type -> ARN pattern used instead of `"*"`.
    pub resource_arns: BTreeMap<String, String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            group_by: GroupBy::default(),
            use_wildcard_resources: false,
            include_sids: true,
            resource_arns: BTreeMap::new(),
        }
    }
}

impl GenerationOptions {
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            ..Default::default()
        }
    }

    pub fn with_wildcard_resources(mut self, enabled: bool) -> Self {
        self.use_wildcard_resources = enabled;
        self
    }

    pub fn with_resource_arn(mut self, resource_type: impl Into<String>, arn: impl Into<String>) -> Self {
        self.resource_arns.insert(resource_type.into(), arn.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_normalizes_lists() {
        let stmt = Statement::allow(
            None,
            ["s3:PutObject", "s3:GetObject", "s3:PutObject"],
            ["*", "*"],
        );
        assert_eq!(stmt.actions(), ["s3:GetObject", "s3:PutObject"]);
        assert_eq!(stmt.resources(), ["*"]);
        assert_eq!(stmt.effect(), Effect::Allow);
    }

    #[test]
    fn test_wire_field_names() {
        let policy = Policy::sealed(vec![Statement::allow(
            Some("S3Permissions".into()),
            ["s3:GetObject"],
            ["*"],
        )]);
        assert_eq!(
            policy.to_compact_json().unwrap(),
            r#"{"Version":"2012-10-17","Statement":[{"Sid":"S3Permissions","Effect":"Allow","Action":["s3:GetObject"],"Resource":["*"]}]}"#
        );
    }

    #[test]
    fn test_sid_omitted_when_absent() {
        let policy = Policy::sealed(vec![Statement::allow(None, ["s3:GetObject"], ["*"])]);
        let json = policy.to_compact_json().unwrap();
        assert!(!json.contains("Sid"));
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent() {
        let policy = Policy::sealed(vec![]);
        assert_eq!(
            policy.to_json().unwrap(),
            "{\n  \"Version\": \"2012-10-17\",\n  \"Statement\": []\n}"
        );
    }

    #[test]
    fn test_from_json_normalizes_and_accepts_scalar_resource() {
        let policy = Policy::from_json(
            r#"{"Version":"2012-10-17","Statement":[
                {"Effect":"Deny","Action":["s3:B","s3:A","s3:A"],"Resource":"*"}
            ]}"#,
        )
        .unwrap();
        let stmt = &policy.statements()[0];
        assert_eq!(stmt.effect(), Effect::Deny);
        assert_eq!(stmt.actions(), ["s3:A", "s3:B"]);
        assert_eq!(stmt.resources(), ["*"]);
        assert!(stmt.sid().is_none());
    }

    #[test]
    fn test_services_from_statements() {
        let policy = Policy::sealed(vec![
            Statement::allow(None, ["s3:GetObject", "ec2:RunInstances"], ["*"]),
            Statement::allow(None, ["s3:PutObject", "*"], ["*"]),
        ]);
        assert_eq!(policy.services(), vec!["ec2", "s3"]);
    }

    #[test]
    fn test_default_options_include_sids() {
        let options = GenerationOptions::default();
        assert!(options.include_sids);
        assert!(!options.use_wildcard_resources);
        assert_eq!(options.group_by, GroupBy::Service);
    }

    #[test]
    fn test_group_by_parsing() {
        assert_eq!("Service".parse::<GroupBy>().unwrap(), GroupBy::Service);
        assert_eq!("flat".parse::<GroupBy>().unwrap(), GroupBy::Flat);
        assert_eq!(GroupBy::Resource.to_string(), "resource");
        assert!("by-color".parse::<GroupBy>().is_err());
    }
}
