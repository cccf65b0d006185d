// src/dist/packager.rs

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::dist::manifest::DistributionManifest;
use crate::errors::{BuildError, Result};
use crate::exec::run_inherited;
use crate::fs::FileSystem;

/// Environment variable carrying the manifest path to the packager command.
pub const MANIFEST_ENV: &str = "BUILDDAG_MANIFEST";

pub type PackagerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Turns a [`DistributionManifest`] into platform archives.
pub trait Packager: Send + Sync {
    fn package<'a>(&'a self, manifest: &'a DistributionManifest) -> PackagerFuture<'a>;
}

/// Writes the manifest to `<build_dir>/manifest.toml` and runs a shell
/// command with [`MANIFEST_ENV`] pointing at it.
pub struct CommandPackager {
    cmd: String,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for CommandPackager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPackager")
            .field("cmd", &self.cmd)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl CommandPackager {
    pub fn new(cmd: impl Into<String>, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cmd: cmd.into(),
            root: root.into(),
            fs,
        }
    }
}

impl Packager for CommandPackager {
    fn package<'a>(&'a self, manifest: &'a DistributionManifest) -> PackagerFuture<'a> {
        Box::pin(async move {
            let manifest_path = self.root.join(&manifest.build_dir).join("manifest.toml");
            self.fs.write(&manifest_path, manifest.to_toml()?.as_bytes())?;

            let env = BTreeMap::from([(
                MANIFEST_ENV.to_string(),
                manifest_path.to_string_lossy().into_owned(),
            )]);

            info!(
                name = %manifest.name,
                version = %manifest.version,
                platforms = ?manifest.platforms,
                "packaging"
            );
            let output = run_inherited(&self.cmd, &self.root, &env)
                .await
                .map_err(|e| BuildError::Packager(format!("{e:#}")))?;

            if !output.success {
                return Err(BuildError::Packager(format!(
                    "`{}` exited with status {}",
                    self.cmd, output.code
                )));
            }
            Ok(())
        })
    }
}
