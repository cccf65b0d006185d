// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{BuildError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Validated, immutable adjacency view of the declared tasks.
///
/// Construction checks every structural rule (duplicates, unknown or self
/// dependencies, cycles), so the scheduler can rely on a well-formed graph.
#[derive(Debug, Clone)]
pub struct DagGraph {
    /// Task names in declaration order.
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build and validate a graph from `(name, dependencies)` declarations.
    pub fn new<I>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TaskName, Vec<TaskName>)>,
    {
        let mut order = Vec::new();
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        for (name, deps) in declarations {
            if nodes.contains_key(&name) {
                return Err(BuildError::ConfigError(format!(
                    "task '{name}' is declared more than once"
                )));
            }
            if deps.iter().any(|d| d == &name) {
                return Err(BuildError::ConfigError(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            order.push(name.clone());
            nodes.insert(
                name,
                DagNode {
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: every dep must exist; populate dependents.
        for name in &order {
            let deps = nodes.get(name).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                match nodes.get_mut(&dep) {
                    Some(dep_node) => dep_node.dependents.push(name.clone()),
                    None => {
                        return Err(BuildError::ConfigError(format!(
                            "task '{name}' depends on unknown task '{dep}'"
                        )));
                    }
                }
            }
        }

        let graph = Self { order, nodes };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<()> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(BuildError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// All task names, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task, in declared order.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `target` plus all its transitive dependencies, each listed once,
    /// dependencies before dependents.
    ///
    /// Returns `None` for an unknown target.
    pub fn closure_of(&self, target: &str) -> Option<Vec<TaskName>> {
        if !self.contains(target) {
            return None;
        }

        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.visit_post_order(target, &mut visited, &mut out);
        Some(out)
    }

    fn visit_post_order(&self, name: &str, visited: &mut HashSet<TaskName>, out: &mut Vec<TaskName>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        for dep in self.dependencies_of(name) {
            self.visit_post_order(dep, visited, out);
        }
        out.push(name.to_string());
    }
}
