// src/pipeline/copy.rs

use std::path::Path;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::pipeline::pathspec::PathSpec;

/// Copy every file matched by `spec` into `dest`, unchanged, preserving each
/// file's path relative to the spec base.
///
/// Returns the number of files copied. Nothing matching is not an error.
pub fn copy_tree(fs: &dyn FileSystem, root: &Path, spec: &PathSpec, dest: &Path) -> Result<usize> {
    let files = spec.resolve(fs, root)?;
    for file in &files {
        let target = dest.join(&file.rel);
        debug!(from = ?file.path, to = ?target, "copying");
        fs.copy(&file.path, &target)?;
    }
    info!(pattern = spec.include(), copied = files.len(), "copied files");
    Ok(files.len())
}
