// tests/graph_proptest.rs

use std::collections::{BTreeSet, HashSet, VecDeque};

use builddag::dag::{DagGraph, Scheduler};
use builddag::engine::TaskOutcome;
use proptest::prelude::*;

/// Random acyclic declarations: task N may only depend on tasks 0..N.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps: BTreeSet<usize> = if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        };
                        (
                            format!("t{i}"),
                            deps.into_iter().map(|d| format!("t{d}")).collect(),
                        )
                    })
                    .collect()
            },
        )
    })
}

fn transitive_dependents(graph: &DagGraph, task: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<String> = graph.dependents_of(task).iter().cloned().collect();
    while let Some(t) = queue.pop_front() {
        if seen.insert(t.clone()) {
            queue.extend(graph.dependents_of(&t).iter().cloned());
        }
    }
    seen
}

proptest! {
    #[test]
    fn closure_lists_dependencies_before_dependents(decls in dag_strategy(12), pick in any::<usize>()) {
        let graph = DagGraph::new(decls.clone()).unwrap();
        let target = &decls[pick % decls.len()].0;
        let order = graph.closure_of(target).unwrap();

        prop_assert_eq!(order.last(), Some(target));
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        for (i, task) in order.iter().enumerate() {
            for dep in graph.dependencies_of(task) {
                let pos = order.iter().position(|t| t == dep);
                prop_assert!(matches!(pos, Some(p) if p < i), "{} must precede {}", dep, task);
            }
        }
    }

    #[test]
    fn runs_respect_dependencies_and_terminate(
        decls in dag_strategy(12),
        pick in any::<usize>(),
        failing in proptest::collection::hash_set(0..12usize, 0..3),
    ) {
        let graph = DagGraph::new(decls.clone()).unwrap();
        let target = decls[pick % decls.len()].0.clone();
        let closure: HashSet<String> = graph.closure_of(&target).unwrap().into_iter().collect();
        let failing: HashSet<String> = failing.into_iter().map(|i| format!("t{i}")).collect();

        let mut scheduler = Scheduler::new(graph.clone());
        let mut ready: VecDeque<String> = scheduler
            .start_run(&target)
            .newly_scheduled
            .into_iter()
            .map(|t| t.name)
            .collect();

        let mut dispatched = HashSet::new();
        let mut succeeded = HashSet::new();
        let mut failed = Vec::new();
        let mut finished = false;
        let mut steps = 0;

        while let Some(task) = ready.pop_front() {
            steps += 1;
            prop_assert!(steps <= decls.len(), "more dispatches than tasks");
            prop_assert!(closure.contains(&task), "{} is outside the closure", task);
            prop_assert!(dispatched.insert(task.clone()), "{} dispatched twice", task);
            for dep in graph.dependencies_of(&task) {
                prop_assert!(succeeded.contains(dep), "{} ran before {}", task, dep);
            }

            let outcome = if failing.contains(&task) {
                failed.push(task.clone());
                TaskOutcome::Failed("boom".into())
            } else {
                succeeded.insert(task.clone());
                TaskOutcome::Success
            };

            let step = scheduler.step_completion(&task, outcome);
            ready.extend(step.newly_scheduled.into_iter().map(|t| t.name));
            finished |= step.run_just_finished;
        }

        prop_assert!(finished);
        prop_assert!(scheduler.is_idle());

        for f in &failed {
            for dependent in transitive_dependents(&graph, f) {
                prop_assert!(!dispatched.contains(&dependent), "{} ran after {} failed", dependent, f);
            }
        }

        if failed.is_empty() {
            prop_assert_eq!(dispatched, closure);
            prop_assert!(scheduler.first_failure().is_none());
        } else {
            prop_assert_eq!(scheduler.first_failure().map(|(t, _)| t), Some(failed[0].as_str()));
        }
    }
}
