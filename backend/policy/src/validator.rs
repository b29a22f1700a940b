//! Structural lint for policy documents. Findings are warnings, not errors.

use std::fmt;

use iamgen_core::{IamGenError, Result, WILDCARD};
use serde::Serialize;

use crate::types::Policy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyWarning {
    /// `policy` or `Statement[<index>]`
    pub path: String,
    pub message: String,
}

impl PolicyWarning {
    fn policy(message: impl Into<String>) -> Self {
        Self {
            path: "policy".into(),
            message: message.into(),
        }
    }

    fn statement(index: usize, message: impl Into<String>) -> Self {
        Self {
            path: format!("Statement[{index}]"),
            message: message.into(),
        }
    }
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn is_wildcard_only(values: &[String]) -> bool {
    matches!(values, [only] if only == WILDCARD)
}

/// Check a policy for empty or overly broad statements.
///
/// `wildcard_resources_requested` silences the `"*"` resource warning for
/// callers that asked for wildcard scopes on purpose.
pub fn validate(policy: Option<&Policy>, wildcard_resources_requested: bool) -> Result<Vec<PolicyWarning>> {
    let policy = policy.ok_or(IamGenError::NilPolicy)?;
    let mut warnings = Vec::new();

    if policy.statements().is_empty() {
        warnings.push(PolicyWarning::policy("policy has no statements"));
    }

    for (index, stmt) in policy.statements().iter().enumerate() {
        if stmt.actions().is_empty() {
            warnings.push(PolicyWarning::statement(index, "statement has no actions"));
        }
        if stmt.resources().is_empty() {
            warnings.push(PolicyWarning::statement(index, "statement has no resources"));
        }
        if is_wildcard_only(stmt.actions()) {
            warnings.push(PolicyWarning::statement(
                index,
                "statement allows all actions (overly broad actions)",
            ));
        }
        if is_wildcard_only(stmt.resources()) && !wildcard_resources_requested {
            warnings.push(PolicyWarning::statement(
                index,
                "statement applies to all resources (overly broad resources)",
            ));
        }
    }

    Ok(warnings)
}
