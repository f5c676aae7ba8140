//! Ligand file discovery.

use std::path::{Path, PathBuf};

use dockyard_common::{DockyardError, Result};
use globset::GlobBuilder;
use tracing::{debug, info};

/// List files in `dir` whose name matches `pattern`, sorted lexicographically.
///
/// Only the directory itself is scanned; subdirectories are skipped.
pub fn discover_ligands(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    let entries = std::fs::read_dir(dir).map_err(|e| DockyardError::io(dir, e))?;

    let mut ligands = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DockyardError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| DockyardError::io(entry.path(), e))?;
        if file_type.is_dir() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            ligands.push(entry.path());
        } else {
            debug!("Skipping {:?}: does not match {}", entry.file_name(), pattern);
        }
    }

    ligands.sort();
    info!("Found {} ligand conformer files in {}", ligands.len(), dir.display());
    Ok(ligands)
}
