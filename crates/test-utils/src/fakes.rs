//! In-memory stand-ins for the external collaborators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use builddag::dist::{DistributionManifest, Packager, PackagerFuture};
use builddag::errors::BuildError;
use builddag::pipeline::{
    BatchReport, CompileFailure, Reporter, SourceLocation, Transform, TransformFuture,
};
use builddag::testrun::{TestRunFuture, TestRunner};

/// Marker that makes [`FakeTransform`] reject a source.
pub const SYNTAX_ERROR: &str = "!syntax-error";

/// Uppercases its input. Sources containing [`SYNTAX_ERROR`] fail with a
/// location on the line of the marker.
#[derive(Debug, Default)]
pub struct FakeTransform {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every transform call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transform for FakeTransform {
    fn transform<'a>(&'a self, source: &'a str, path: &'a Path) -> TransformFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(idx) = source.lines().position(|l| l.contains(SYNTAX_ERROR)) {
                return Err(CompileFailure::new(path, "unexpected token").at(SourceLocation {
                    line: idx as u32 + 1,
                    column: None,
                }));
            }
            Ok(source.to_uppercase())
        })
    }
}

/// Records every failure and every finished batch.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    failures: Mutex<Vec<(String, CompileFailure)>>,
    batches: Mutex<Vec<BatchReport>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failures(&self) -> Vec<(String, CompileFailure)> {
        self.failures.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<BatchReport> {
        self.batches.lock().unwrap().clone()
    }

    /// Number of finished batches of the named pipeline.
    pub fn batch_count(&self, pipeline: &str) -> usize {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.pipeline == pipeline)
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn compile_failed(&self, pipeline: &str, failure: &CompileFailure) {
        self.failures
            .lock()
            .unwrap()
            .push((pipeline.to_string(), failure.clone()));
    }

    fn batch_finished(&self, report: &BatchReport) {
        self.batches.lock().unwrap().push(report.clone());
    }
}

/// Keeps the manifests it was asked to package.
#[derive(Debug, Default)]
pub struct RecordingPackager {
    manifests: Mutex<Vec<DistributionManifest>>,
}

impl RecordingPackager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn manifests(&self) -> Vec<DistributionManifest> {
        self.manifests.lock().unwrap().clone()
    }
}

impl Packager for RecordingPackager {
    fn package<'a>(&'a self, manifest: &'a DistributionManifest) -> PackagerFuture<'a> {
        Box::pin(async move {
            self.manifests.lock().unwrap().push(manifest.clone());
            Ok(())
        })
    }
}

/// Keeps the files and environment of every test run; optionally fails.
#[derive(Debug, Default)]
pub struct RecordingTestRunner {
    runs: Mutex<Vec<(Vec<PathBuf>, BTreeMap<String, String>)>>,
    fail: bool,
}

impl RecordingTestRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn runs(&self) -> Vec<(Vec<PathBuf>, BTreeMap<String, String>)> {
        self.runs.lock().unwrap().clone()
    }
}

impl TestRunner for RecordingTestRunner {
    fn run_tests<'a>(
        &'a self,
        files: &'a [PathBuf],
        env: &'a BTreeMap<String, String>,
    ) -> TestRunFuture<'a> {
        Box::pin(async move {
            self.runs.lock().unwrap().push((files.to_vec(), env.clone()));
            if self.fail {
                return Err(BuildError::TestRunner("2 failing".to_string()));
            }
            Ok(())
        })
    }
}
