// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// A vertex that will never run because `upstream` failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTask {
    pub name: TaskName,
    /// The failed task at the root of the skip.
    pub upstream: TaskName,
}

/// Structured result of a single scheduler "step".
///
/// Tests can drive the walk by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The task that failed in this step, if any.
    pub newly_failed: Vec<TaskName>,
    /// Dependents skipped because of that failure (transitively).
    pub newly_skipped: Vec<SkippedTask>,
    /// Whether every vertex is terminal after this step.
    pub run_just_finished: bool,
}
