// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the dependency graph and the cycle check.
//! - [`scheduler`] contains the walk state machine that decides which
//!   tasks are ready to run and which are skipped after a failure.
//! - [`task_info`] provides per-vertex state and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::{SchedulerStep, SkippedTask};
pub use task_info::{ScheduledTask, TaskRunState};
