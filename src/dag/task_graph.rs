// src/dag/task_graph.rs

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::{DagGraph, Scheduler};
use crate::engine::{CoreRuntime, Runtime, TaskName};
use crate::errors::{BuildError, Result};
use crate::exec::ActionExecutor;

/// Boxed future returned by a task action.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A task's action. Invoked at most once per [`TaskGraph::run`].
pub type TaskAction = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// What a successful [`TaskGraph::run`] executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub target: TaskName,
    /// Tasks in the order their actions completed.
    pub completed: Vec<TaskName>,
}

struct Declaration {
    name: TaskName,
    deps: Vec<TaskName>,
    action: TaskAction,
}

/// Collects task declarations until [`build`](Self::build) validates them.
#[derive(Default)]
pub struct TaskGraphBuilder {
    declarations: Vec<Declaration>,
    default_task: Option<TaskName>,
}

impl fmt::Debug for TaskGraphBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.declarations.iter().map(|d| d.name.as_str()).collect();
        f.debug_struct("TaskGraphBuilder")
            .field("tasks", &names)
            .field("default_task", &self.default_task)
            .finish()
    }
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Validation is deferred to [`build`](Self::build).
    pub fn declare<F, Fut>(&mut self, name: &str, deps: &[&str], action: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let action: TaskAction = Arc::new(move || Box::pin(action()) as ActionFuture);
        self.declarations.push(Declaration {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            action,
        });
        self
    }

    /// Task run by [`TaskGraph::run_default`].
    pub fn default_task(&mut self, name: &str) -> &mut Self {
        self.default_task = Some(name.to_string());
        self
    }

    /// Validate the declarations and freeze the graph.
    pub fn build(self) -> Result<TaskGraph> {
        let graph = DagGraph::new(
            self.declarations
                .iter()
                .map(|d| (d.name.clone(), d.deps.clone())),
        )?;

        if let Some(default) = &self.default_task {
            if !graph.contains(default) {
                return Err(BuildError::ConfigError(format!(
                    "default task '{default}' is not declared"
                )));
            }
        }

        let actions = self
            .declarations
            .into_iter()
            .map(|d| (d.name, d.action))
            .collect();

        Ok(TaskGraph {
            graph,
            actions: Arc::new(actions),
            default_task: self.default_task,
        })
    }
}

/// Immutable, validated set of tasks.
///
/// Each call to [`run`](Self::run) is an independent run with fresh per-run
/// state, so the same graph can be run repeatedly.
#[derive(Clone)]
pub struct TaskGraph {
    graph: DagGraph,
    actions: Arc<HashMap<TaskName, TaskAction>>,
    default_task: Option<TaskName>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("graph", &self.graph)
            .field("default_task", &self.default_task)
            .finish_non_exhaustive()
    }
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    pub fn dag(&self) -> &DagGraph {
        &self.graph
    }

    pub fn default_task(&self) -> Option<&str> {
        self.default_task.as_deref()
    }

    /// Run `name` after its transitive dependencies.
    ///
    /// Every task in the closure runs at most once; independent tasks run
    /// concurrently. On failure, dependents of the failed task never start
    /// and the first failure is returned once in-flight actions have drained.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        if !self.graph.contains(name) {
            return Err(BuildError::TaskNotFound(name.to_string()));
        }
        debug!(task = name, closure = ?self.graph.closure_of(name), "resolved task closure");

        let (tx, rx) = mpsc::channel(64);
        let executor = ActionExecutor::new(Arc::clone(&self.actions), tx);
        let core = CoreRuntime::new(Scheduler::new(self.graph.clone()));

        Runtime::new(core, rx, executor).run(name).await
    }

    /// Run the configured default task.
    pub async fn run_default(&self) -> Result<RunReport> {
        match &self.default_task {
            Some(name) => self.run(name).await,
            None => Err(BuildError::ConfigError("no default task configured".to_string())),
        }
    }
}
