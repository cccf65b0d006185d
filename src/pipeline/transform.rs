// src/pipeline/transform.rs

//! Source-type transforms: the seam to the external compilers.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use regex::Regex;
use tracing::debug;

use crate::config::PipelineSection;
use crate::errors::{BuildError, Result};
use crate::exec::command::run_captured;
use crate::pipeline::result::{CompileFailure, SourceLocation};

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<String, CompileFailure>> + Send + 'a>>;

/// Pure, possibly failing, source-to-output transform.
///
/// Implementations must not write anything themselves; the pipeline owns the
/// destination tree.
pub trait Transform: Send + Sync {
    fn transform<'a>(&'a self, source: &'a str, path: &'a Path) -> TransformFuture<'a>;
}

/// Transform that pipes the source into a shell command and reads the
/// compiled text from its stdout.
///
/// A non-zero exit status (or a failure to start the command) becomes a
/// [`CompileFailure`] whose message is the command's stderr. The location is
/// extracted from stderr with the configured regex.
pub struct CommandTransform {
    cmd: String,
    cwd: PathBuf,
    location: Regex,
}

impl fmt::Debug for CommandTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTransform")
            .field("cmd", &self.cmd)
            .finish_non_exhaustive()
    }
}

impl CommandTransform {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>, location_pattern: &str) -> Result<Self> {
        let location = Regex::new(location_pattern).map_err(|e| {
            BuildError::ConfigError(format!("invalid location pattern {location_pattern:?}: {e}"))
        })?;
        Ok(Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
            location,
        })
    }

    pub fn from_section(section: &PipelineSection, cwd: impl Into<PathBuf>) -> Result<Self> {
        Self::new(section.cmd.clone(), cwd, &section.location_pattern)
    }

    fn locate(&self, stderr: &str) -> Option<SourceLocation> {
        let caps = self.location.captures(stderr)?;
        let line = caps.name("line")?.as_str().parse().ok()?;
        let column = caps.name("column").and_then(|m| m.as_str().parse().ok());
        Some(SourceLocation { line, column })
    }
}

impl Transform for CommandTransform {
    fn transform<'a>(&'a self, source: &'a str, path: &'a Path) -> TransformFuture<'a> {
        Box::pin(async move {
            let env = BTreeMap::new();
            let output = run_captured(&self.cmd, &self.cwd, Some(source.as_bytes().to_vec()), &env)
                .await
                .map_err(|e| CompileFailure::new(path, format!("failed to run compiler: {e:#}")))?;

            if output.success {
                debug!(file = ?path, bytes = output.stdout.len(), "compiled");
                return Ok(output.stdout);
            }

            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("compiler exited with status {}", output.code)
            } else {
                stderr.to_string()
            };

            let mut failure = CompileFailure::new(path, message);
            failure.location = self.locate(stderr);
            Err(failure)
        })
    }
}
