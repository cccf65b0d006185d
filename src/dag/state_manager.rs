// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Mutating view over the task map for one scheduler step.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include the target and all of its upstream dependencies in this run.
    ///
    /// Tasks already participating keep their current state, so a task
    /// reachable through several paths is still only run once.
    pub fn mark_closure_pending(&mut self, target: &str) {
        let mut stack: Vec<TaskName> = vec![target.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            match self.tasks.get_mut(&name) {
                Some(info) => {
                    if info.run_state.is_none() {
                        info.run_state = Some(RunState::Pending);
                        debug!(task = %info.name, "marked Pending for this run");
                    }
                    stack.extend(self.graph.dependencies_of(&name).iter().cloned());
                }
                None => warn!(task = %name, "node in DAG not present in tasks map"),
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every dependent of a failed task that is still waiting in this
    /// run as `DoneFailed`, transitively.
    ///
    /// Returns the newly failed tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                // Running cannot happen here: a dependent is only dispatched
                // once all its deps succeeded.
                if let Some(RunState::Pending) = info.run_state {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "dependent will not run due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        newly_failed
    }

    /// Collect `Pending` tasks whose dependencies all succeeded in this run,
    /// mark them `Running` and return them for dispatch.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending))
                    && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::new();
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(
                    task = %info.name,
                    run_id = self.current_run_id,
                    "dependencies satisfied; starting task"
                );
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Whether nothing in the run is pending or running any more.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// Read-only view used when only shared access to the task map is available.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A task may start only once every direct dependency finished
    /// successfully in the current run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => matches!(dep.run_state, Some(RunState::DoneSuccess)),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
