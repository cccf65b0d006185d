// src/pipeline/mod.rs

//! Source selection, per-file compilation and the plain copy step.
//!
//! A [`CompilationPipeline`] is one source type: a [`PathSpec`] picking the
//! inputs, a [`Transform`] turning each one into output text, and a
//! destination tree. Per-file failures are reported through a [`Reporter`]
//! and never abort the batch.

pub mod compile;
pub mod copy;
pub mod pathspec;
pub mod report;
pub mod result;
pub mod transform;

pub use compile::CompilationPipeline;
pub use copy::copy_tree;
pub use pathspec::{MatchedFile, PathSpec};
pub use report::{LogReporter, Reporter};
pub use result::{BatchReport, CompileFailure, CompileResult, SourceLocation};
pub use transform::{CommandTransform, Transform, TransformFuture};
