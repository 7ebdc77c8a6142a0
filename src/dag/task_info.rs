// src/dag/task_info.rs

//! Per-vertex walk state.

use std::sync::Arc;

use crate::engine::TaskName;
use crate::workflow::Task;

/// State of one vertex during a walk.
///
/// `Pending → Ready → Running → {Succeeded | Failed}`, plus `Skipped` for
/// vertices whose ancestor failed. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Waiting on unfinished requirements.
    Pending,
    /// Every requirement succeeded; handed to the coordinator.
    Ready,
    /// Dispatched to an executor backend.
    Running,
    Succeeded,
    Failed,
    /// Never run because an upstream task failed.
    Skipped,
}

impl TaskRunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskRunState::Succeeded | TaskRunState::Failed | TaskRunState::Skipped
        )
    }
}

/// Static task data plus walk state for one vertex.
#[derive(Debug, Clone)]
pub(crate) struct TaskInfo {
    pub name: TaskName,
    /// `None` for phantom vertices.
    pub task: Option<Arc<Task>>,
    pub state: TaskRunState,
    /// Direct requirements that have not succeeded yet.
    pub unfinished_deps: usize,
    /// Root failure that caused this vertex to be skipped.
    pub skipped_by: Option<TaskName>,
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub task: Arc<Task>,
}
