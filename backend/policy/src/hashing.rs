use iamgen_core::Result;
use sha2::{Digest, Sha256};

use crate::types::Policy;

/// Lowercase hex SHA-256 of the policy's compact JSON.
///
/// Used to detect changes between runs, nothing more.
pub fn content_hash(policy: &Policy) -> Result<String> {
    let json = policy.to_compact_json()?;
    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PolicyBuilder;

    fn policy(actions: &[&str]) -> Policy {
        let mut builder = PolicyBuilder::new();
        builder.add_allow(None, actions.iter().copied(), ["*"]);
        builder.build()
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = content_hash(&policy(&["s3:GetObject", "s3:PutObject"])).unwrap();
        let b = content_hash(&policy(&["s3:PutObject", "s3:GetObject"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = content_hash(&policy(&["s3:GetObject"])).unwrap();
        let b = content_hash(&policy(&["s3:PutObject"])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_policy_hash() {
        // sha256 of {"Version":"2012-10-17","Statement":[]}
        let hash = content_hash(&PolicyBuilder::new().build()).unwrap();
        let expected = hex::encode(Sha256::digest(br#"{"Version":"2012-10-17","Statement":[]}"#));
        assert_eq!(hash, expected);
    }
}
