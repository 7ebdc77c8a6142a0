// tests/scheduler_walk.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use forensicflow::dag::{Scheduler, TaskRunState};
use forensicflow::engine::TaskOutcome;
use forensicflow::workflow::{Task, Workflow};
use forensicflow_test_utils::builders::{TaskBuilder, WorkflowBuilder};

/// A → {B, C}
fn fan_out() -> Workflow {
    WorkflowBuilder::new()
        .with_task(TaskBuilder::shell("A", "a").build())
        .with_task(TaskBuilder::shell("B", "b").requires("A").build())
        .with_task(TaskBuilder::shell("C", "c").requires("A").build())
        .build()
}

fn scheduler_for(workflow: &Workflow) -> Scheduler {
    let tasks: BTreeMap<String, Arc<Task>> = workflow
        .tasks()
        .map(|t| (t.name.clone(), Arc::new(t.clone())))
        .collect();
    Scheduler::new(workflow.graph().unwrap(), &tasks)
}

fn names(tasks: &[forensicflow::dag::ScheduledTask]) -> BTreeSet<String> {
    tasks.iter().map(|t| t.name.clone()).collect()
}

#[test]
fn roots_are_released_on_start() {
    let workflow = fan_out();
    let mut scheduler = scheduler_for(&workflow);

    let step = scheduler.start();
    assert_eq!(names(&step.newly_scheduled), BTreeSet::from(["A".to_string()]));
    assert_eq!(scheduler.run_state_of("A"), Some(TaskRunState::Ready));
    assert_eq!(scheduler.run_state_of("B"), Some(TaskRunState::Pending));
    assert_eq!(scheduler.unfinished_dependencies("B"), Some(1));

    // A second start changes nothing.
    assert!(scheduler.start().newly_scheduled.is_empty());
}

#[test]
fn success_releases_all_dependents_together() {
    let workflow = fan_out();
    let mut scheduler = scheduler_for(&workflow);
    scheduler.start();
    scheduler.mark_running("A");
    assert_eq!(scheduler.run_state_of("A"), Some(TaskRunState::Running));

    let ready = scheduler.handle_completion("A", TaskOutcome::Success);
    assert_eq!(
        names(&ready),
        BTreeSet::from(["B".to_string(), "C".to_string()])
    );

    scheduler.handle_completion("B", TaskOutcome::Success);
    assert!(!scheduler.is_finished());
    let step = scheduler.step_completion("C", TaskOutcome::Success);
    assert!(step.run_just_finished);
    assert!(scheduler.is_finished());
}

#[test]
fn failure_skips_direct_dependents() {
    let workflow = fan_out();
    let mut scheduler = scheduler_for(&workflow);
    scheduler.start();

    let step = scheduler.step_completion("A", TaskOutcome::Failed);
    assert_eq!(step.newly_failed, vec!["A".to_string()]);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);

    for dependent in ["B", "C"] {
        assert_eq!(scheduler.run_state_of(dependent), Some(TaskRunState::Skipped));
        assert_eq!(scheduler.skipped_by(dependent), Some("A"));
    }
}

#[test]
fn failure_propagates_transitively_but_not_sideways() {
    // A → B → C, D independent, E requires both B and D.
    let workflow = WorkflowBuilder::new()
        .with_task(TaskBuilder::shell("A", "a").build())
        .with_task(TaskBuilder::shell("B", "b").requires("A").build())
        .with_task(TaskBuilder::shell("C", "c").requires("B").build())
        .with_task(TaskBuilder::shell("D", "d").build())
        .with_task(TaskBuilder::shell("E", "e").requires("B").requires("D").build())
        .build();
    let mut scheduler = scheduler_for(&workflow);

    let started = scheduler.start();
    assert_eq!(
        names(&started.newly_scheduled),
        BTreeSet::from(["A".to_string(), "D".to_string()])
    );

    let step = scheduler.step_completion("A", TaskOutcome::Failed);
    let skipped: BTreeSet<_> = step.newly_skipped.iter().map(|s| s.name.clone()).collect();
    assert_eq!(
        skipped,
        BTreeSet::from(["B".to_string(), "C".to_string(), "E".to_string()])
    );
    assert!(step.newly_skipped.iter().all(|s| s.upstream == "A"));
    assert!(!scheduler.is_finished(), "D is still running");

    let ready = scheduler.handle_completion("D", TaskOutcome::Success);
    assert!(ready.is_empty(), "E must not run after B was skipped");
    assert_eq!(scheduler.run_state_of("D"), Some(TaskRunState::Succeeded));
    assert!(scheduler.is_finished());
}

#[test]
fn completions_for_terminal_tasks_are_ignored() {
    let workflow = fan_out();
    let mut scheduler = scheduler_for(&workflow);
    scheduler.start();
    scheduler.handle_completion("A", TaskOutcome::Failed);

    // A skipped task reporting in must not resurrect it.
    let step = scheduler.step_completion("B", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.run_state_of("B"), Some(TaskRunState::Skipped));

    // A second completion for A is ignored too.
    let step = scheduler.step_completion("A", TaskOutcome::Success);
    assert!(step.newly_failed.is_empty());
    assert_eq!(scheduler.run_state_of("A"), Some(TaskRunState::Failed));
}

#[test]
fn phantom_requirements_are_satisfied_immediately() {
    let workflow = WorkflowBuilder::new()
        .with_task(TaskBuilder::shell("report", "r").requires("missing").build())
        .build_with_phantoms();
    let mut scheduler = scheduler_for(&workflow);

    let step = scheduler.start();
    assert_eq!(names(&step.newly_scheduled), BTreeSet::from(["report".to_string()]));
    assert_eq!(scheduler.run_state_of("missing"), Some(TaskRunState::Succeeded));

    scheduler.handle_completion("report", TaskOutcome::Success);
    assert!(scheduler.is_finished());
}
