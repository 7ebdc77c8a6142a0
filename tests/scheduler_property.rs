// tests/scheduler_property.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use proptest::prelude::*;

use forensicflow::dag::{Scheduler, TaskRunState};
use forensicflow::engine::TaskOutcome;
use forensicflow::workflow::{Task, Workflow};
use forensicflow_test_utils::builders::{TaskBuilder, WorkflowBuilder};

// Acyclic by construction: task N only requires tasks 0..N-1.
fn workflow_strategy(max_tasks: usize) -> impl Strategy<Value = Workflow> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut builder = WorkflowBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i}");
                let mut task = TaskBuilder::shell(&name, &name);
                let deps: BTreeSet<usize> = potential_deps
                    .into_iter()
                    .filter(|_| i > 0)
                    .map(|d| d % i.max(1))
                    .collect();
                for dep in deps {
                    task = task.requires(&format!("task_{dep}"));
                }
                builder = builder.with_task(task.build());
            }
            builder.build()
        })
    })
}

fn scheduler_for(workflow: &Workflow) -> Scheduler {
    let tasks: BTreeMap<String, Arc<Task>> = workflow
        .tasks()
        .map(|t| (t.name.clone(), Arc::new(t.clone())))
        .collect();
    Scheduler::new(workflow.graph().unwrap(), &tasks)
}

/// Every transitive requirement of `task`.
fn ancestors(workflow: &Workflow, task: &str) -> BTreeSet<String> {
    let graph = workflow.graph().unwrap();
    let mut seen = BTreeSet::new();
    let mut stack: Vec<String> = graph.dependencies_of(task).to_vec();
    while let Some(dep) = stack.pop() {
        if seen.insert(dep.clone()) {
            stack.extend(graph.dependencies_of(&dep).iter().cloned());
        }
    }
    seen
}

proptest! {
    #[test]
    fn walk_terminates_and_respects_dependencies(
        workflow in workflow_strategy(12),
        failing in proptest::collection::btree_set(0..12usize, 0..4),
        pick in proptest::collection::vec(any::<usize>(), 64),
    ) {
        let failing: BTreeSet<String> = failing.into_iter().map(|i| format!("task_{i}")).collect();
        let mut scheduler = scheduler_for(&workflow);
        let graph = workflow.graph().unwrap();

        let mut in_flight: VecDeque<String> = scheduler
            .start()
            .newly_scheduled
            .into_iter()
            .map(|t| t.name)
            .collect();
        let mut dispatched: Vec<String> = Vec::new();
        let mut picks = pick.into_iter().cycle();

        while !in_flight.is_empty() {
            // Complete an arbitrary in-flight task to vary the order.
            let idx = picks.next().unwrap_or(0) % in_flight.len();
            let task = in_flight.remove(idx).unwrap();

            for dep in graph.dependencies_of(&task) {
                prop_assert_eq!(
                    scheduler.run_state_of(dep),
                    Some(TaskRunState::Succeeded),
                    "{} dispatched before {} succeeded", task, dep
                );
            }
            prop_assert!(!dispatched.contains(&task), "{} dispatched twice", task);
            dispatched.push(task.clone());

            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed
            } else {
                TaskOutcome::Success
            };
            in_flight.extend(
                scheduler
                    .handle_completion(&task, outcome)
                    .into_iter()
                    .map(|t| t.name),
            );
        }

        prop_assert!(scheduler.is_finished());

        for task in workflow.tasks() {
            let state = scheduler.run_state_of(&task.name).unwrap();
            prop_assert!(state.is_terminal());

            let upstream_failed = ancestors(&workflow, &task.name)
                .iter()
                .any(|a| scheduler.run_state_of(a) == Some(TaskRunState::Failed));
            if upstream_failed {
                prop_assert_eq!(state, TaskRunState::Skipped);
                prop_assert!(!dispatched.contains(&task.name));
            } else if failing.contains(&task.name) {
                prop_assert_eq!(state, TaskRunState::Failed);
            } else {
                prop_assert_eq!(state, TaskRunState::Succeeded);
            }
        }
    }
}
