use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The wildcard permission / resource scope.
pub const WILDCARD: &str = "*";

/// A deduplicated set of permission identifiers (e.g. `"s3:CreateBucket"`).
///
/// Backed by a `BTreeSet`, so iteration and export are always sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single permission. Returns `true` if it was not already present.
    pub fn add(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    /// Union another set into this one.
    pub fn add_all(&mut self, other: &PermissionSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Sorted export.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// A new set holding the union of `self` and `other`.
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        let mut out = self.clone();
        out.add_all(other);
        out
    }

    /// Number of permissions present in both sets.
    pub fn intersection_len(&self, other: &PermissionSet) -> usize {
        self.0.intersection(&other.0).count()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for PermissionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for PermissionSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_sorted_vec().join(", "))
    }
}

/// Service namespace of a permission: the text before the first `:`.
///
/// Returns `None` for malformed permissions with no separator or an empty prefix.
pub fn service_of(permission: &str) -> Option<&str> {
    match permission.split_once(':') {
        Some((service, _)) if !service.is_empty() => Some(service),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut set = PermissionSet::new();
        assert!(set.add("s3:GetObject"));
        assert!(!set.add("s3:GetObject"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("s3:GetObject"));
        assert!(!set.contains("s3:PutObject"));
    }

    #[test]
    fn test_sorted_export() {
        let set: PermissionSet = ["s3:PutObject", "ec2:RunInstances", "s3:GetObject"]
            .into_iter()
            .collect();
        assert_eq!(
            set.to_sorted_vec(),
            vec!["ec2:RunInstances", "s3:GetObject", "s3:PutObject"]
        );
    }

    #[test]
    fn test_union_size_and_commutativity() {
        let a: PermissionSet = ["s3:A", "s3:B", "s3:C"].into_iter().collect();
        let b: PermissionSet = ["s3:C", "s3:D"].into_iter().collect();

        let ab = a.union(&b);
        let ba = b.union(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), a.len() + b.len() - a.intersection_len(&b));
        assert_eq!(ab.len(), 4);
    }

    #[test]
    fn test_service_of() {
        assert_eq!(service_of("s3:GetObject"), Some("s3"));
        assert_eq!(service_of("logs:Create:Extra"), Some("logs"));
        assert_eq!(service_of("malformed"), None);
        assert_eq!(service_of(":NoService"), None);
    }

    #[test]
    fn test_serializes_as_sorted_list() {
        let set: PermissionSet = ["b:Two", "a:One"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["a:One","b:Two"]"#);
    }
}
