// src/engine/report.rs

//! Per-task results of one walk.

use std::collections::BTreeMap;

use crate::dag::TaskRunState;
use crate::engine::TaskName;
use crate::errors::{ForensicflowError, Result, RunFailure, TaskError};

/// Terminal record for one task.
#[derive(Debug)]
pub struct TaskResult {
    pub name: TaskName,
    pub state: TaskRunState,
    pub error: Option<TaskError>,
}

impl TaskResult {
    pub fn succeeded(&self) -> bool {
        self.state == TaskRunState::Succeeded
    }
}

/// Results of every task in a finished walk, keyed by task name.
#[derive(Debug, Default)]
pub struct RunReport {
    results: BTreeMap<TaskName, TaskResult>,
}

impl RunReport {
    pub fn new(results: impl IntoIterator<Item = TaskResult>) -> Self {
        Self {
            results: results.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn get(&self, task: &str) -> Option<&TaskResult> {
        self.results.get(task)
    }

    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.results.get(task).map(|r| r.state)
    }

    pub fn results(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(TaskResult::succeeded)
    }

    /// `Ok(())` when every task succeeded, otherwise the aggregated failure.
    pub fn into_result(self) -> Result<()> {
        let failures: Vec<TaskError> = self
            .results
            .into_values()
            .filter_map(|r| r.error)
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ForensicflowError::RunFailed(RunFailure::new(failures)))
        }
    }
}
