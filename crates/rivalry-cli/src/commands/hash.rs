//! Hash command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rivalry_core::stable_hash_value;
use serde_json::Value;

/// Stable hash of the JSON document at `path`
pub fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(stable_hash_value(&value))
}

pub fn cmd_hash(input: &Path) -> Result<()> {
    println!("{}", hash_file(input)?);
    Ok(())
}
