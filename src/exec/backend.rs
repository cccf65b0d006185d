// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning actions
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `ActionExecutor` is the production implementation. It looks up each
//!   scheduled task's action, spawns it on Tokio and reports
//!   `TaskCompleted` back over the runtime channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dag::{ScheduledTask, TaskAction};
use crate::engine::{RuntimeEvent, TaskName, TaskOutcome};
use crate::errors::Result;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Every dispatched task must eventually produce exactly one
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs declared task actions as Tokio tasks.
pub struct ActionExecutor {
    actions: Arc<HashMap<TaskName, TaskAction>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl ActionExecutor {
    pub fn new(
        actions: Arc<HashMap<TaskName, TaskAction>>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            actions,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for ActionExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                let tx = self.runtime_tx.clone();
                let action = self.actions.get(&task.name).cloned();

                tokio::spawn(async move {
                    let outcome = match action {
                        Some(action) => {
                            debug!(task = %task.name, run_id = task.run_id, "running action");
                            // Inner task so a panicking action still completes.
                            match tokio::spawn(async move { action().await }).await {
                                Ok(Ok(())) => TaskOutcome::Success,
                                Ok(Err(e)) => TaskOutcome::Failed(format!("{e:#}")),
                                Err(join_err) => {
                                    warn!(task = %task.name, error = %join_err, "action panicked");
                                    TaskOutcome::Failed(format!("action panicked: {join_err}"))
                                }
                            }
                        }
                        None => TaskOutcome::Failed(format!("no action registered for '{}'", task.name)),
                    };

                    let event = RuntimeEvent::TaskCompleted {
                        task: task.name.clone(),
                        outcome,
                    };
                    if tx.send(event).await.is_err() {
                        warn!(task = %task.name, "runtime gone; dropping completion");
                    }
                });
            }
            Ok(())
        })
    }
}
