//! Content-hashed file names and the revision manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::BuildError;

/// Hex digits of the content hash embedded in revisioned names.
pub const HASH_LENGTH: usize = 10;

/// Short content hash of `contents`.
pub fn content_hash(contents: &[u8]) -> String {
    let digest = Sha256::digest(contents);
    let hex = format!("{:x}", digest);
    hex[..HASH_LENGTH].to_string()
}

/// Insert the content hash before the extension: `spec.json` -> `spec-<hash>.json`.
pub fn revision_name(name: &str, contents: &[u8]) -> String {
    let hash = content_hash(contents);
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, hash, ext),
        None => format!("{}-{}", stem, hash),
    }
}

/// Record `original -> written` in the manifest at `path`, merging with any
/// entries already there.
pub fn record(path: &Path, original: &str, written: &str) -> Result<(), BuildError> {
    let mut entries: BTreeMap<String, String> = if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| BuildError::ManifestError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| BuildError::ManifestError(format!("{}: {}", path.display(), e)))?
    } else {
        BTreeMap::new()
    };

    entries.insert(original.to_string(), written.to_string());

    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| BuildError::ManifestError(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }
    fs::write(path, json).map_err(|e| BuildError::WriteError(e.to_string()))?;

    Ok(())
}
