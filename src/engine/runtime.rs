// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{RunReport, ScheduledTask};
use crate::errors::{BuildError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TaskOutcome};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run `target` to completion.
    ///
    /// Returns only once every dispatched action has reported back, so a
    /// failure on one branch still lets already running siblings finish.
    pub async fn run(mut self, target: &str) -> Result<RunReport> {
        info!(task = target, "task run started");

        let mut completed = Vec::new();
        let mut step = self.core.start(target);

        loop {
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(BuildError::Other(anyhow::anyhow!(
                        "runtime event channel closed before run of '{target}' finished"
                    )));
                }
            };

            debug!(?event, "runtime received event");
            let RuntimeEvent::TaskCompleted { task, outcome } = &event;
            if *outcome == TaskOutcome::Success {
                completed.push(task.clone());
            }

            step = self.core.step(event);
        }

        if let Some((task, message)) = self.core.scheduler().first_failure() {
            return Err(BuildError::TaskFailed {
                task: task.to_string(),
                message: message.to_string(),
            });
        }

        info!(task = target, tasks = completed.len(), "task run finished");
        Ok(RunReport {
            target: target.to_string(),
            completed,
        })
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::RunFinished => debug!("core reported run finished"),
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
