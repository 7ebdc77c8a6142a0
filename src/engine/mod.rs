// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the DAG scheduler
//! - an executor backend that runs ready tasks concurrently
//! - the coordinating loop that funnels every completion back through the
//!   scheduler, one at a time
//!
//! The walk itself lives in [`crate::dag::Scheduler`]; the async shell is
//! implemented in [`runtime`] and the per-task results in [`report`].

use std::path::PathBuf;

use crate::cmdline::Arguments;
use crate::errors::TaskError;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Success/failure as seen by the scheduler. The scheduler never looks at
/// backend-specific error content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

impl<T> From<&Result<T, TaskError>> for TaskOutcome {
    fn from(result: &Result<T, TaskError>) -> Self {
        match result {
            Ok(_) => TaskOutcome::Success,
            Err(_) => TaskOutcome::Failed,
        }
    }
}

/// Events flowing into the runtime from executor backends.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched task reached a terminal state.
    TaskCompleted {
        task: TaskName,
        result: Result<(), TaskError>,
    },
}

/// Per-run inputs shared by every task of one walk.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Evidence store directory; working directory of shell tasks and
    /// mounted at `/store` in containers.
    pub store_path: PathBuf,
    /// Mounted at `/plugins` in containers; base for relative build contexts.
    pub plugin_dir: PathBuf,
    /// Workflow-level arguments.
    pub arguments: Arguments,
}

impl RunContext {
    pub fn new(store_path: impl Into<PathBuf>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            plugin_dir: plugin_dir.into(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }
}

pub mod report;
pub mod runtime;

pub use report::{RunReport, TaskResult};
pub use runtime::Runtime;
