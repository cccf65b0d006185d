// src/pipeline/compile.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::fs::FileSystem;
use crate::pipeline::pathspec::{MatchedFile, PathSpec};
use crate::pipeline::report::{LogReporter, Reporter};
use crate::pipeline::result::{BatchReport, CompileResult};
use crate::pipeline::transform::Transform;

/// One source type's compile-and-write operation.
///
/// Every call to [`compile`](Self::compile) re-resolves the [`PathSpec`], runs
/// the transform over each matched file (concurrently, at most `jobs` at a
/// time) and writes successful outputs under `dest`, keeping each file's path
/// relative to the spec base and swapping in the configured extension.
///
/// A file whose transform fails is reported and skipped; the rest of the
/// batch carries on. Only filesystem failures abort the batch.
#[derive(Clone)]
pub struct CompilationPipeline {
    name: String,
    spec: PathSpec,
    transform: Arc<dyn Transform>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    dest: PathBuf,
    extension: Option<String>,
    jobs: usize,
    reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for CompilationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationPipeline")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

impl CompilationPipeline {
    pub fn new(
        name: impl Into<String>,
        spec: PathSpec,
        transform: Arc<dyn Transform>,
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            spec,
            transform,
            fs,
            root: root.into(),
            dest: dest.into(),
            extension: None,
            jobs: 4,
            reporter: Arc::new(LogReporter::default()),
        }
    }

    /// Replace the extension of every output file (e.g. `"js"`).
    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    /// Where a matched file's output lands.
    pub fn output_path(&self, rel: &Path) -> PathBuf {
        let out = self.dest.join(rel);
        match &self.extension {
            Some(ext) => out.with_extension(ext),
            None => out,
        }
    }

    /// Run one batch.
    ///
    /// Returns once every matched file has been attempted. The reporter's
    /// `batch_finished` hook fires exactly once, just before returning `Ok`.
    pub async fn compile(&self) -> Result<BatchReport> {
        let files = self.spec.resolve(self.fs.as_ref(), &self.root)?;
        info!(
            pipeline = %self.name,
            matched = files.len(),
            "compiling"
        );

        let permits = Arc::new(Semaphore::new(self.jobs));
        let mut set = JoinSet::new();

        for file in files {
            let output = self.output_path(&file.rel);
            let permits = Arc::clone(&permits);
            let fs = Arc::clone(&self.fs);
            let transform = Arc::clone(&self.transform);

            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("pipeline semaphore closed: {e}"))?;
                compile_one(fs, transform, file, output).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::from(e).into()),
            };

            match outcome {
                Ok(Some(result)) => {
                    if let CompileResult::Failed(failure) = &result {
                        self.reporter.compile_failed(&self.name, failure);
                    }
                    results.push(result);
                }
                Ok(None) => {}
                Err(e) => {
                    set.abort_all();
                    return Err(e);
                }
            }
        }

        results.sort_by(|a, b| a.source().cmp(b.source()));
        let report = BatchReport {
            pipeline: self.name.clone(),
            results,
        };
        self.reporter.batch_finished(&report);
        Ok(report)
    }
}

/// Read, transform and write a single file.
///
/// Returns `Ok(None)` when the file vanished between resolution and reading.
async fn compile_one(
    fs: Arc<dyn FileSystem>,
    transform: Arc<dyn Transform>,
    file: MatchedFile,
    output: PathBuf,
) -> Result<Option<CompileResult>> {
    let source = {
        let fs = Arc::clone(&fs);
        let path = file.path.clone();
        tokio::task::spawn_blocking(move || match fs.read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(_) if !fs.exists(&path) => Ok(None),
            Err(e) => Err(e),
        })
        .await
        .map_err(Error::from)??
    };

    let Some(source) = source else {
        debug!(file = ?file.path, "source disappeared before compilation; skipping");
        return Ok(None);
    };

    match transform.transform(&source, &file.path).await {
        Ok(compiled) => {
            let target = output.clone();
            tokio::task::spawn_blocking(move || fs.write(&target, compiled.as_bytes()))
                .await
                .map_err(Error::from)??;
            debug!(file = ?file.path, output = ?output, "wrote output");
            Ok(Some(CompileResult::Written {
                source: file.path,
                output,
            }))
        }
        Err(failure) => Ok(Some(CompileResult::Failed(failure))),
    }
}
