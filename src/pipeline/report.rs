// src/pipeline/report.rs

//! Error-reporting side channel for pipelines.

use std::io::Write;

use tracing::{info, warn};

use crate::pipeline::result::{BatchReport, CompileFailure};

/// Receives per-file failures and the end-of-batch notification.
///
/// `batch_finished` is called exactly once per pipeline invocation, after
/// every `compile_failed` call of that invocation.
pub trait Reporter: Send + Sync {
    fn compile_failed(&self, pipeline: &str, failure: &CompileFailure);
    fn batch_finished(&self, report: &BatchReport);
}

/// Production reporter: logs through `tracing` and optionally rings the
/// terminal bell on failures.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    beep: bool,
}

impl LogReporter {
    pub fn new(beep: bool) -> Self {
        Self { beep }
    }
}

impl Reporter for LogReporter {
    fn compile_failed(&self, pipeline: &str, failure: &CompileFailure) {
        if self.beep {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(b"\x07");
            let _ = stderr.flush();
        }
        warn!(
            pipeline,
            file = %failure.source.display(),
            location = ?failure.location,
            "{}",
            failure
        );
    }

    fn batch_finished(&self, report: &BatchReport) {
        info!(
            pipeline = %report.pipeline,
            written = report.written_count(),
            failed = report.failure_count(),
            "{} rebuilt",
            report.pipeline
        );
    }
}
