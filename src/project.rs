// src/project.rs

//! The fixed task set of a project and the collaborators its actions use.
//!
//! | task            | depends on | action                                   |
//! |-----------------|------------|------------------------------------------|
//! | `clean`         |            | remove `[paths].clean` directories       |
//! | `vendor`        | `clean`    | copy `[paths].vendor` into the dest root |
//! | `build-scripts` |            | scripts pipeline                         |
//! | `build-styles`  |            | styles pipeline                          |
//! | `build`         | `vendor`   | both pipelines, concurrently             |
//! | `watch`         | `build`    | watch session (default task)             |
//! | `test`          |            | test runner over `[test]` files          |
//! | `dist`          | `build`    | assemble manifest, run packager          |

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{ConfigFile, PipelineSection};
use crate::dag::{TaskGraph, TaskGraphBuilder};
use crate::dist::{CommandPackager, DistributionManifest, Packager};
use crate::errors::{BuildError, Error, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{
    BatchReport, CommandTransform, CompilationPipeline, LogReporter, PathSpec, Reporter,
    Transform, copy_tree,
};
use crate::testrun::{CommandTestRunner, TestRunner};
use crate::watch::{WatchEngine, WatchSubscription};

pub const CLEAN: &str = "clean";
pub const VENDOR: &str = "vendor";
pub const BUILD_SCRIPTS: &str = "build-scripts";
pub const BUILD_STYLES: &str = "build-styles";
pub const BUILD: &str = "build";
pub const WATCH: &str = "watch";
pub const TEST: &str = "test";
pub const DIST: &str = "dist";

/// Pipeline names, also used in "rebuilt" notifications.
pub const SCRIPTS: &str = "scripts";
pub const STYLES: &str = "styles";

/// Project root, configuration and every external collaborator.
///
/// [`Project::new`] wires the production implementations; the `with_*`
/// methods swap any of them out.
#[derive(Clone)]
pub struct Project {
    config: Arc<ConfigFile>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    scripts: Arc<dyn Transform>,
    styles: Arc<dyn Transform>,
    reporter: Arc<dyn Reporter>,
    packager: Arc<dyn Packager>,
    test_runner: Arc<dyn TestRunner>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl Project {
    pub fn new(config: Arc<ConfigFile>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

        let scripts = Arc::new(CommandTransform::from_section(config.scripts(), &root)?);
        let styles = Arc::new(CommandTransform::from_section(config.styles(), &root)?);
        let reporter = Arc::new(LogReporter::new(config.config_section().beep));
        let packager = Arc::new(CommandPackager::new(
            config.dist().cmd.clone(),
            &root,
            Arc::clone(&fs),
        ));
        let test_runner = Arc::new(CommandTestRunner::new(config.test().cmd.clone(), &root));

        Ok(Self {
            config,
            root,
            fs,
            scripts,
            styles,
            reporter,
            packager,
            test_runner,
        })
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_transforms(mut self, scripts: Arc<dyn Transform>, styles: Arc<dyn Transform>) -> Self {
        self.scripts = scripts;
        self.styles = styles;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_test_runner(mut self, test_runner: Arc<dyn TestRunner>) -> Self {
        self.test_runner = test_runner;
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dest(&self) -> PathBuf {
        self.root.join(&self.config.paths().dest)
    }

    fn pipeline(
        &self,
        name: &str,
        section: &PipelineSection,
        transform: &Arc<dyn Transform>,
    ) -> Result<CompilationPipeline> {
        let spec = PathSpec::new(&section.include, &section.exclude)?;
        Ok(CompilationPipeline::new(
            name,
            spec,
            Arc::clone(transform),
            Arc::clone(&self.fs),
            &self.root,
            self.dest(),
        )
        .with_extension(section.extension.clone())
        .with_jobs(self.config.config_section().jobs)
        .with_reporter(Arc::clone(&self.reporter)))
    }

    pub fn scripts_pipeline(&self) -> Result<CompilationPipeline> {
        self.pipeline(SCRIPTS, self.config.scripts(), &self.scripts)
    }

    pub fn styles_pipeline(&self) -> Result<CompilationPipeline> {
        self.pipeline(STYLES, self.config.styles(), &self.styles)
    }

    /// One subscription per pipeline, keyed on its watch pattern (or its own
    /// include/exclude patterns when none is configured).
    pub fn watch_subscriptions(&self) -> Result<Vec<WatchSubscription>> {
        let mut subs = Vec::new();
        for (section, pipeline) in [
            (self.config.scripts(), self.scripts_pipeline()?),
            (self.config.styles(), self.styles_pipeline()?),
        ] {
            let spec = match &section.watch {
                Some(pattern) => PathSpec::new(pattern, &[])?,
                None => pipeline.spec().clone(),
            };
            subs.push(WatchSubscription::for_pipeline(spec, pipeline));
        }
        Ok(subs)
    }

    /// Remove every `[paths].clean` directory, concurrently.
    pub async fn clean(&self) -> Result<()> {
        let mut set = JoinSet::new();
        for dir in &self.config.paths().clean {
            let fs = Arc::clone(&self.fs);
            let path = self.root.join(dir);
            set.spawn_blocking(move || {
                debug!(dir = ?path, "removing");
                fs.remove_dir_all(&path)
            });
        }

        while let Some(joined) = set.join_next().await {
            joined.map_err(Error::from)??;
        }
        info!(dirs = ?self.config.paths().clean, "cleaned");
        Ok(())
    }

    /// Copy vendor assets into the destination root.
    pub async fn vendor(&self) -> Result<usize> {
        let spec = PathSpec::new(&self.config.paths().vendor, &[])?;
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let dest = self.dest();

        tokio::task::spawn_blocking(move || copy_tree(fs.as_ref(), &root, &spec, &dest))
            .await
            .map_err(Error::from)?
    }

    /// Run both pipelines concurrently; the first fatal error wins.
    pub async fn build(&self) -> Result<(BatchReport, BatchReport)> {
        let scripts = self.scripts_pipeline()?;
        let styles = self.styles_pipeline()?;

        let (scripts, styles) = tokio::join!(scripts.compile(), styles.compile());
        Ok((scripts?, styles?))
    }

    pub async fn watch(&self) -> Result<()> {
        WatchEngine::new(&self.root, self.watch_subscriptions()?)
            .with_config(self.config.config_section())
            .watch()
            .await
    }

    pub async fn test(&self) -> Result<()> {
        let section = self.config.test();
        let spec = PathSpec::new(&section.include, &section.exclude)?;
        let files: Vec<PathBuf> = spec
            .resolve(self.fs.as_ref(), &self.root)?
            .into_iter()
            .map(|f| f.path)
            .collect();

        if files.is_empty() {
            return Err(BuildError::TestRunner(format!(
                "no test files match '{}'",
                section.include
            )));
        }
        self.test_runner.run_tests(&files, &section.env).await
    }

    pub async fn dist(&self) -> Result<()> {
        let manifest = DistributionManifest::assemble(
            self.fs.as_ref(),
            &self.root,
            &self.config.paths().dest,
            self.config.dist(),
        )?;
        self.packager.package(&manifest).await
    }

    /// Declare the fixed task set.
    pub fn task_graph(self: &Arc<Self>) -> Result<TaskGraph> {
        let mut builder = TaskGraphBuilder::new();

        let p = Arc::clone(self);
        builder.declare(CLEAN, &[], move || {
            let p = Arc::clone(&p);
            async move { p.clean().await }
        });

        let p = Arc::clone(self);
        builder.declare(VENDOR, &[CLEAN], move || {
            let p = Arc::clone(&p);
            async move { p.vendor().await.map(|_copied| ()) }
        });

        let p = Arc::clone(self);
        builder.declare(BUILD_SCRIPTS, &[], move || {
            let p = Arc::clone(&p);
            async move { p.scripts_pipeline()?.compile().await.map(|_report| ()) }
        });

        let p = Arc::clone(self);
        builder.declare(BUILD_STYLES, &[], move || {
            let p = Arc::clone(&p);
            async move { p.styles_pipeline()?.compile().await.map(|_report| ()) }
        });

        let p = Arc::clone(self);
        builder.declare(BUILD, &[VENDOR], move || {
            let p = Arc::clone(&p);
            async move { p.build().await.map(|_reports| ()) }
        });

        let p = Arc::clone(self);
        builder.declare(WATCH, &[BUILD], move || {
            let p = Arc::clone(&p);
            async move { p.watch().await }
        });

        let p = Arc::clone(self);
        builder.declare(TEST, &[], move || {
            let p = Arc::clone(&p);
            async move { p.test().await }
        });

        let p = Arc::clone(self);
        builder.declare(DIST, &[BUILD], move || {
            let p = Arc::clone(&p);
            async move { p.dist().await }
        });

        builder.default_task(WATCH);
        builder.build()
    }
}
