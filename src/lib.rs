// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod dist;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod project;
pub mod testrun;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::config::model::ConfigFile;
use crate::dag::TaskGraph;
use crate::errors::Result;
use crate::project::Project;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the project's collaborators and task graph
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = Arc::new(load_or_default(&config_path)?);
    let root = config_root_dir(&config_path);

    let project = Arc::new(Project::new(Arc::clone(&cfg), &root)?);
    let graph = project.task_graph()?;

    if args.dry_run {
        print_dry_run(&cfg, &graph, args.task.as_deref());
        return Ok(());
    }

    let run = async {
        match args.task.as_deref() {
            Some(task) => graph.run(task).await,
            None => graph.run_default().await,
        }
    };

    tokio::select! {
        report = run => {
            let report = report?;
            info!(task = %report.target, completed = ?report.completed, "done");
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
            info!("interrupted; stopping");
            Ok(())
        }
    }
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "app/Builddag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Builddag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: configuration summary, then every task with its
/// dependencies and full execution order.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph, selected: Option<&str>) {
    let section = cfg.config_section();
    println!("builddag dry-run");
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        section.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", section.queue_length);
    println!("  config.debounce_ms = {}", section.debounce_ms);
    println!("  config.jobs = {}", section.jobs);
    println!("  paths.dest = {}", cfg.paths().dest);
    println!("  scripts = {} -> *.{}", cfg.scripts().include, cfg.scripts().extension.as_deref().unwrap_or("*"));
    println!("  styles = {} -> *.{}", cfg.styles().include, cfg.styles().extension.as_deref().unwrap_or("*"));
    println!();

    let dag = graph.dag();
    let default = graph.default_task().unwrap_or("-");
    println!("tasks (default: {default}):");
    for name in dag.tasks() {
        let marker = if Some(name) == selected { " <- selected" } else { "" };
        println!("  - {name}{marker}");
        let deps = dag.dependencies_of(name);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        if let Some(order) = dag.closure_of(name) {
            println!("      runs: {}", order.join(" -> "));
        }
    }

    debug!("dry-run complete (no execution)");
}
