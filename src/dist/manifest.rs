// src/dist/manifest.rs

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::DistSection;
use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::PathSpec;
use crate::types::Platform;

/// Everything the packager needs to know to produce the archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionManifest {
    pub name: String,
    pub version: String,
    pub platforms: Vec<Platform>,
    /// Destination root the `files` are relative to.
    pub source_dir: PathBuf,
    /// Every file under `source_dir`, sorted.
    pub files: Vec<PathBuf>,
    /// Files shipped alongside the build output, relative to the project root.
    pub aux_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    pub build_dir: PathBuf,
    pub archive: String,
}

impl DistributionManifest {
    /// Collect the current contents of `dest` plus the configured auxiliary
    /// files.
    ///
    /// An empty destination tree or a missing auxiliary file is a
    /// [`BuildError::Packager`] error: there would be nothing sensible to
    /// ship.
    pub fn assemble(
        fs: &dyn FileSystem,
        root: &Path,
        dest: &str,
        section: &DistSection,
    ) -> Result<Self> {
        let dest_glob = format!("{}/**/*", dest.trim_end_matches('/'));
        let spec = PathSpec::new(&dest_glob, &[])?;
        let files: Vec<PathBuf> = spec
            .resolve(fs, root)?
            .into_iter()
            .map(|f| f.rel)
            .collect();

        if files.is_empty() {
            return Err(BuildError::Packager(format!(
                "nothing to package: '{dest}' is empty"
            )));
        }

        let mut aux_files = Vec::new();
        for file in &section.files {
            if !fs.is_file(&root.join(file)) {
                return Err(BuildError::Packager(format!(
                    "auxiliary file '{file}' does not exist"
                )));
            }
            aux_files.push(PathBuf::from(file));
        }

        debug!(
            files = files.len(),
            aux = aux_files.len(),
            platforms = ?section.platforms,
            "assembled distribution manifest"
        );

        Ok(Self {
            name: section.name.clone(),
            version: section.version.clone(),
            platforms: section.platforms.clone(),
            source_dir: PathBuf::from(dest),
            files,
            aux_files,
            icon: section.icon.as_ref().map(PathBuf::from),
            build_dir: PathBuf::from(&section.build_dir),
            archive: section.archive.clone(),
        })
    }

    /// TOML rendering handed to the packager.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BuildError::Packager(format!("cannot render manifest: {e}")))
    }
}
