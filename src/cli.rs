// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `builddag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "builddag",
    version,
    about = "Build, watch and package a small script/stylesheet project.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run: clean, vendor, build-scripts, build-styles, build,
    /// watch, test or dist.
    ///
    /// Default: `watch`.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Builddag.toml` in the current working directory; built-in
    /// defaults are used when that file does not exist.
    #[arg(long, value_name = "PATH", default_value = "Builddag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_is_positional_and_optional() {
        let args = CliArgs::try_parse_from(["builddag"]).unwrap();
        assert!(args.task.is_none());
        assert_eq!(args.config, "Builddag.toml");

        let args =
            CliArgs::try_parse_from(["builddag", "dist", "--config", "ci.toml", "--log-level", "debug"])
                .unwrap();
        assert_eq!(args.task.as_deref(), Some("dist"));
        assert_eq!(args.config, "ci.toml");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
