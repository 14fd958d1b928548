//! Output directory manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

/// A file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
}

/// Regular files directly under `dir`, sorted by name.
pub async fn build_manifest(dir: &Path) -> std::io::Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        entries.push(ManifestEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Names of everything currently in `dir`.
pub(crate) async fn snapshot(dir: &Path) -> std::io::Result<HashSet<OsString>> {
    let mut names = HashSet::new();
    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        names.insert(entry.file_name());
    }
    Ok(names)
}
