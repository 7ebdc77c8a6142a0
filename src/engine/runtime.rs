// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::errors::{ForensicflowError, Result, TaskError};
use crate::exec::ExecutorBackend;

use super::{RunReport, RuntimeEvent, TaskName, TaskOutcome, TaskResult};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This loop is the single coordinator of a walk: backends run tasks
/// concurrently, but every completion is applied to the scheduler here,
/// one event at a time.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    results: BTreeMap<TaskName, TaskResult>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(scheduler: Scheduler, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            results: BTreeMap::new(),
        }
    }

    /// Main event loop. Returns once every task is terminal.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("workflow runtime started");

        let step = self.scheduler.start();
        self.apply_step(step).await?;

        while !self.scheduler.is_finished() {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(ForensicflowError::RuntimeError(
                        "event channel closed before every task finished".to_string(),
                    ));
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskCompleted { task, result } => {
                    self.handle_completion(task, result).await?;
                }
            }
        }

        info!(tasks = self.results.len(), "workflow runtime finished");
        Ok(RunReport::new(self.results.into_values()))
    }

    async fn handle_completion(
        &mut self,
        task: TaskName,
        result: std::result::Result<(), TaskError>,
    ) -> Result<()> {
        if !matches!(
            self.scheduler.run_state_of(&task),
            Some(TaskRunState::Ready | TaskRunState::Running)
        ) {
            warn!(task = %task, "completion for task that is not running; ignoring");
            return Ok(());
        }

        let outcome = TaskOutcome::from(&result);
        let step = self.scheduler.step_completion(&task, outcome);

        let record = match result {
            Ok(()) => {
                info!(task = %task, "task succeeded");
                TaskResult {
                    name: task.clone(),
                    state: TaskRunState::Succeeded,
                    error: None,
                }
            }
            Err(err) => {
                error!(task = %task, error = %err, "task failed");
                TaskResult {
                    name: task.clone(),
                    state: TaskRunState::Failed,
                    error: Some(err),
                }
            }
        };
        self.results.insert(task, record);

        self.apply_step(step).await
    }

    /// Record skipped tasks and dispatch newly ready ones.
    async fn apply_step(&mut self, step: SchedulerStep) -> Result<()> {
        for skipped in step.newly_skipped {
            if self.scheduler.graph().is_phantom(&skipped.name) {
                continue;
            }
            warn!(
                task = %skipped.name,
                upstream = %skipped.upstream,
                "task skipped: upstream dependency failed"
            );
            let error = TaskError::UpstreamDependencyFailed {
                task: skipped.name.clone(),
                upstream: skipped.upstream,
            };
            self.results.insert(
                skipped.name.clone(),
                TaskResult {
                    name: skipped.name,
                    state: TaskRunState::Skipped,
                    error: Some(error),
                },
            );
        }

        self.spawn_ready(step.newly_scheduled).await
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        for task in &tasks {
            self.scheduler.mark_running(&task.name);
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
