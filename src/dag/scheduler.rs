// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a task is ready to run (deps succeeded)
/// - marking tasks as succeeded/failed
/// - failing dependents when a task fails
/// - remembering the first failure of the run
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    first_failure: Option<(TaskName, String)>,
}

impl Scheduler {
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
            first_failure: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// First task that failed in the most recent run, with its message.
    pub fn first_failure(&self) -> Option<(&str, &str)> {
        self.first_failure
            .as_ref()
            .map(|(task, msg)| (task.as_str(), msg.as_str()))
    }

    /// Start a run for `target`: reset per-run state, mark the target's
    /// closure pending and return the tasks that can start immediately.
    pub fn start_run(&mut self, target: &str) -> SchedulerStep {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.first_failure = None;
        for info in self.tasks.values_mut() {
            info.run_state = None;
        }
        debug!(run_id = self.run_counter, task = %target, "scheduler: starting new run");

        if !self.tasks.contains_key(target) {
            warn!(task = %target, "run requested for unknown task; ignoring");
            self.current_run_id = None;
            return SchedulerStep {
                run_just_finished: true,
                ..SchedulerStep::default()
            };
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_closure_pending(target);
        let newly_scheduled = manager.collect_new_ready_tasks();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished: false,
        }
    }

    /// Record the outcome of a dispatched task.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                }
                TaskOutcome::Failed(message) => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(
                        task = %info.name,
                        run_id,
                        error = %message,
                        "task failed; dependents will not run"
                    );
                    newly_failed.push(info.name.clone());
                    if self.first_failure.is_none() {
                        self.first_failure = Some((task.to_string(), message));
                    }
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_failed.append(&mut manager.mark_dependents_failed(task));
                }
            },
            None => warn!(task = %task, "completion for unknown task; ignoring"),
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }

    /// Clear `current_run_id` once every task in the run is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "all tasks terminal; run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }
}
