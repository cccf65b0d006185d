// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `ActionExecutor` that the runtime uses to run task actions, and which
//!   tests can replace with a fake implementation.
//! - [`command`] runs external commands (compilers, test runner, packager)
//!   through the platform shell.

pub mod backend;
pub mod command;

pub use backend::{ActionExecutor, ExecutorBackend};
pub use command::{CommandOutput, run_captured, run_inherited};
