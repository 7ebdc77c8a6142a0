use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::{SchedulerStep, SkippedTask};
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::workflow::Task;

/// Scheduler holds the immutable DAG plus mutable walk state.
///
/// It is responsible for:
/// - counting unfinished requirements per vertex
/// - releasing vertices whose requirements all succeeded
/// - marking tasks as succeeded/failed
/// - skipping every transitive dependent of a failed task
/// - noticing when every vertex is terminal
///
/// It performs no IO. The async runtime funnels completions into it one at
/// a time, which is what keeps readiness decisions serialized.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskName, TaskInfo>,
    started: bool,
    finished: bool,
}

impl Scheduler {
    /// Build walk state for `graph`. Vertices without an entry in `tasks`
    /// are phantoms and never reach an executor.
    pub fn new(graph: &DagGraph, tasks: &BTreeMap<TaskName, Arc<Task>>) -> Self {
        let infos = graph
            .tasks()
            .map(|name| {
                let info = TaskInfo {
                    name: name.to_string(),
                    task: tasks.get(name).cloned(),
                    state: TaskRunState::Pending,
                    unfinished_deps: graph.dependencies_of(name).len(),
                    skipped_by: None,
                };
                (name.to_string(), info)
            })
            .collect();

        Self {
            graph: graph.clone(),
            tasks: infos,
            started: false,
            finished: false,
        }
    }

    /// Whether every vertex has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.state)
    }

    /// Number of direct requirements of `task` that have not succeeded.
    pub fn unfinished_dependencies(&self, task: &str) -> Option<usize> {
        self.tasks.get(task).map(|info| info.unfinished_deps)
    }

    /// For a skipped task, the failed task that caused the skip.
    pub fn skipped_by(&self, task: &str) -> Option<&str> {
        self.tasks.get(task)?.skipped_by.as_deref()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Release the vertices that have no requirements.
    ///
    /// Calling this twice is a no-op the second time.
    pub fn start(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if self.started {
            warn!("scheduler already started; ignoring");
            return step;
        }
        self.started = true;

        let roots: Vec<TaskName> = self.graph.roots().map(str::to_string).collect();
        info!(?roots, "starting workflow walk");
        self.release(roots, &mut step);
        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Mark tasks handed to an executor as `Running`.
    pub fn mark_running(&mut self, task: &str) {
        match self.tasks.get_mut(task) {
            Some(info) if info.state == TaskRunState::Ready => {
                info.state = TaskRunState::Running;
            }
            Some(info) => {
                warn!(
                    task = %task,
                    state = ?info.state,
                    "mark_running on task that is not Ready; ignoring"
                );
            }
            None => warn!(task = %task, "mark_running for unknown task; ignoring"),
        }
    }

    /// Handle completion of a task (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if !matches!(info.state, TaskRunState::Ready | TaskRunState::Running) {
            warn!(
                task = %task,
                state = ?info.state,
                "completion for task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.state = TaskRunState::Succeeded;
                debug!(task = %task, "task succeeded");
                let dependents = self.satisfy_dependents(task);
                self.release(dependents, &mut step);
            }
            TaskOutcome::Failed => {
                info.state = TaskRunState::Failed;
                warn!(task = %task, "task failed; skipping dependents");
                step.newly_failed.push(task.to_string());
                step.newly_skipped = self.skip_dependents(task);
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Decrement the unfinished count of each Pending dependent of `task`
    /// and return them.
    fn satisfy_dependents(&mut self, task: &str) -> Vec<TaskName> {
        let dependents = self.graph.dependents_of(task).to_vec();
        for name in &dependents {
            if let Some(info) = self.tasks.get_mut(name) {
                if info.state == TaskRunState::Pending {
                    info.unfinished_deps = info.unfinished_deps.saturating_sub(1);
                }
            }
        }
        dependents
    }

    /// Move Pending candidates with no unfinished requirements to `Ready`.
    ///
    /// Phantom vertices succeed on the spot and release their own dependents.
    fn release(&mut self, mut candidates: Vec<TaskName>, step: &mut SchedulerStep) {
        while let Some(name) = candidates.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.state != TaskRunState::Pending || info.unfinished_deps > 0 {
                continue;
            }

            match info.task.clone() {
                Some(task) => {
                    debug!(task = %name, "requirements satisfied; marking Ready");
                    info.state = TaskRunState::Ready;
                    step.newly_scheduled.push(ScheduledTask { name, task });
                }
                None => {
                    warn!(task = %name, "phantom vertex has no task; treating as succeeded");
                    info.state = TaskRunState::Succeeded;
                    candidates.extend(self.satisfy_dependents(&name));
                }
            }
        }
    }

    /// Mark every transitive dependent of a failed task as `Skipped`.
    ///
    /// Only Pending vertices change; anything already terminal keeps its
    /// state (and its first skip cause).
    fn skip_dependents(&mut self, failed_task: &str) -> Vec<SkippedTask> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.state != TaskRunState::Pending {
                    continue;
                }
                info.state = TaskRunState::Skipped;
                info.skipped_by = Some(failed_task.to_string());
                debug!(
                    task = %name,
                    upstream = %failed_task,
                    "skipping dependent due to upstream failure"
                );
                skipped.push(SkippedTask {
                    name: name.clone(),
                    upstream: failed_task.to_string(),
                });
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        skipped
    }

    /// Returns `true` if this call transitioned the walk to finished.
    fn maybe_finish_run(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.tasks.values().all(|info| info.state.is_terminal()) {
            info!("scheduler: all tasks terminal; walk finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}
