// src/errors.rs

//! Crate-wide error types.
//!
//! Three layers:
//! - [`ForensicflowError`]: anything that stops a whole invocation
//!   (bad workflow document, cycle, aggregated run failure).
//! - [`TaskError`]: the terminal cause recorded for one task in a run.
//! - [`BackendError`]: what an executor backend reports; always wrapped in
//!   [`TaskError::ExecutionFailure`] before the scheduler sees it.

use std::fmt;

use thiserror::Error;

use crate::engine::TaskName;
use crate::types::TaskKind;

#[derive(Error, Debug)]
pub enum ForensicflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("task '{task}' requires unknown task '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("cyclic dependency detected in workflow involving task '{task}'")]
    CyclicDependency { task: TaskName },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("{0}")]
    RunFailed(RunFailure),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ForensicflowError>;

/// Failure reported by one executor backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{kind} command '{command}' not found")]
    CommandNotFound { kind: TaskKind, command: String },

    #[error("registry authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("pulling image '{image}' failed: {reason}")]
    PullFailure { image: String, reason: String },

    #[error("building image from '{context}' failed: {reason}")]
    BuildFailure { context: String, reason: String },

    /// Subprocess exit code; `-1` when the process was killed by a signal.
    #[error("process exited with status {code}")]
    NonZeroExit { code: i32 },

    #[error("container exited with status {status}")]
    ContainerExit { status: i64 },

    #[error("container runtime error: {0}")]
    Container(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Terminal cause of a task that did not succeed.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task '{task}' ({kind}) failed: {cause}")]
    ExecutionFailure {
        task: TaskName,
        kind: TaskKind,
        #[source]
        cause: BackendError,
    },

    #[error("task '{task}' skipped: upstream dependency '{upstream}' failed")]
    UpstreamDependencyFailed { task: TaskName, upstream: TaskName },
}

impl TaskError {
    pub fn task(&self) -> &str {
        match self {
            TaskError::ExecutionFailure { task, .. } => task,
            TaskError::UpstreamDependencyFailed { task, .. } => task,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, TaskError::UpstreamDependencyFailed { .. })
    }
}

/// Aggregated outcome of a run with at least one failed or skipped task.
///
/// `failures` is sorted by task name so the rendered message is stable.
#[derive(Debug)]
pub struct RunFailure {
    pub failures: Vec<TaskError>,
}

impl RunFailure {
    pub fn new(mut failures: Vec<TaskError>) -> Self {
        failures.sort_by(|a, b| a.task().cmp(b.task()));
        Self { failures }
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskError> {
        self.failures.iter().filter(|e| !e.is_skip())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &TaskError> {
        self.failures.iter().filter(|e| e.is_skip())
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.failures.iter().map(|e| e.task()).collect()
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed().count();
        let skipped = self.skipped().count();
        write!(
            f,
            "workflow run failed: {failed} task(s) failed, {skipped} task(s) skipped"
        )?;
        for err in &self.failures {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}
