// src/pipeline/result.rs

//! Per-file outcomes and the per-batch report.

use std::fmt;
use std::path::{Path, PathBuf};

/// Position of a compile error inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "line {}, column {}", self.line, col),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// A recoverable, per-file compile failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub source: PathBuf,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl CompileFailure {
    pub fn new(source: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.message)?;
        if let Some(loc) = &self.location {
            write!(f, "\n{loc}")?;
        }
        Ok(())
    }
}

/// Outcome for a single matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    Written { source: PathBuf, output: PathBuf },
    Failed(CompileFailure),
}

impl CompileResult {
    pub fn source(&self) -> &Path {
        match self {
            CompileResult::Written { source, .. } => source,
            CompileResult::Failed(f) => &f.source,
        }
    }
}

/// Everything one pipeline invocation produced.
///
/// Returning a `BatchReport` is the end-of-batch signal: it exists only once
/// every matched file has been attempted.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub pipeline: String,
    /// Sorted by source path.
    pub results: Vec<CompileResult>,
}

impl BatchReport {
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.results.iter().filter_map(|r| match r {
            CompileResult::Written { output, .. } => Some(output.as_path()),
            CompileResult::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &CompileFailure> {
        self.results.iter().filter_map(|r| match r {
            CompileResult::Failed(f) => Some(f),
            CompileResult::Written { .. } => None,
        })
    }

    pub fn written_count(&self) -> usize {
        self.outputs().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}
