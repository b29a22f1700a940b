//! Resource manifest reading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use iamgen_core::ResourceRecord;

/// Read a resource manifest: JSON for `.json` files, YAML otherwise.
///
/// The document is a list of records with `type`, `name`, and optional
/// `attributes` and `location`. An empty file is an empty list.
pub fn read_manifest(path: &Path) -> Result<Vec<ResourceRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let records = if is_json {
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON manifest: {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse YAML manifest: {}", path.display()))?
    };
    Ok(records)
}
