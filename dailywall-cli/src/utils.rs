//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dailywall_core::{ComponentHash, Fingerprint};
use tracing::debug;

/// Read a whole file, naming it in the error.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Regular files directly inside `dir`, sorted by file name.
pub fn list_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Display name of a path (its file name, or the whole path).
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Distinct placeholder fingerprint for simulated pool entries.
pub fn synthetic_fingerprint(n: u64) -> Fingerprint {
    let bytes = n.to_be_bytes();
    Fingerprint::new(
        ComponentHash::new(bytes),
        ComponentHash::new((!n).to_be_bytes()),
        ComponentHash::new(n.rotate_left(32).to_be_bytes()),
    )
}
