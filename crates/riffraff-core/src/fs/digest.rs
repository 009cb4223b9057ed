//! BLAKE3 digests of staged artifacts
//!
//! One digest per staged file, keyed by its path relative to the staging
//! root, plus one for the serialised manifest under `build.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use super::{to_key_path, walk_files};
use crate::manifest::MANIFEST_FILE;

/// Hex digest of a byte slice
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Hex digest of a file's content
pub fn digest_file(path: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digests of every staged file, sorted by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactDigests {
    entries: BTreeMap<String, String>,
}

impl ArtifactDigests {
    /// Digest every file under the staging root
    pub fn of_tree(root: &Path) -> anyhow::Result<Self> {
        let files = walk_files(root)
            .with_context(|| format!("Failed to walk staging directory: {}", root.display()))?;

        let mut entries = BTreeMap::new();
        for relative in files {
            let digest = digest_file(&root.join(&relative))?;
            entries.insert(to_key_path(&relative), digest);
        }
        Ok(Self { entries })
    }

    /// Add the serialised manifest
    pub fn with_manifest(mut self, manifest_json: &[u8]) -> Self {
        self.entries
            .insert(MANIFEST_FILE.to_string(), digest_bytes(manifest_json));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// First 12 hex characters, for listings
pub fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
