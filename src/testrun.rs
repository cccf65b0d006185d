// src/testrun.rs

//! Test-runner seam.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::info;

use crate::errors::{BuildError, Result};
use crate::exec::{command::shell_quote, run_inherited};

pub type TestRunFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Runs the project's test files. A failing test run is fatal.
pub trait TestRunner: Send + Sync {
    fn run_tests<'a>(
        &'a self,
        files: &'a [PathBuf],
        env: &'a BTreeMap<String, String>,
    ) -> TestRunFuture<'a>;
}

/// Shell command with the test files appended as arguments.
pub struct CommandTestRunner {
    cmd: String,
    root: PathBuf,
}

impl fmt::Debug for CommandTestRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTestRunner")
            .field("cmd", &self.cmd)
            .finish_non_exhaustive()
    }
}

impl CommandTestRunner {
    pub fn new(cmd: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            root: root.into(),
        }
    }

    /// Full command line for the given files (root-relative where possible).
    pub fn command_line(&self, files: &[PathBuf]) -> String {
        let mut line = self.cmd.clone();
        for file in files {
            let shown = file.strip_prefix(&self.root).unwrap_or(file);
            line.push(' ');
            line.push_str(&shell_quote(&shown.to_string_lossy()));
        }
        line
    }
}

impl TestRunner for CommandTestRunner {
    fn run_tests<'a>(
        &'a self,
        files: &'a [PathBuf],
        env: &'a BTreeMap<String, String>,
    ) -> TestRunFuture<'a> {
        Box::pin(async move {
            let line = self.command_line(files);
            info!(files = files.len(), "running tests");

            let output = run_inherited(&line, &self.root, env)
                .await
                .map_err(|e| BuildError::TestRunner(format!("{e:#}")))?;

            if !output.success {
                return Err(BuildError::TestRunner(format!(
                    "test command exited with status {}",
                    output.code
                )));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_appended_relative_to_root() {
        let runner = CommandTestRunner::new("mocha --reporter spec", "/proj");
        let line = runner.command_line(&[
            PathBuf::from("/proj/test/a.coffee"),
            PathBuf::from("/proj/test/my spec.coffee"),
        ]);
        assert_eq!(line, "mocha --reporter spec test/a.coffee 'test/my spec.coffee'");
    }
}
