// src/workflow.rs

//! In-memory workflow: named tasks plus the dependency graph built from
//! their `requires` lists.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cmdline::{Arguments, Filter};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{RunContext, RunReport, Runtime, RuntimeEvent, TaskName};
use crate::errors::Result;
use crate::exec::{Dispatcher, ExecutorBackend, RealExecutorBackend};
use crate::registry::Registries;
use crate::types::{MissingDependencyPolicy, TaskKind};

/// One schedulable unit of work. Immutable once the workflow is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub kind: TaskKind,
    /// Script name, image reference, build context or plugin name,
    /// depending on `kind`. When `image` or `dockerfile` is set this is
    /// the command run inside the container instead.
    pub command: String,
    pub arguments: Arguments,
    pub filter: Filter,
    pub requires: Vec<TaskName>,
    /// Explicit image for `Container` tasks.
    pub image: Option<String>,
    /// Explicit build context for `ContainerBuild` tasks.
    pub dockerfile: Option<String>,
    /// Authenticate and pull the image before running (`Container` only).
    pub pull: bool,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, kind: TaskKind, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            command: command.into(),
            arguments: Arguments::new(),
            filter: Filter::default(),
            requires: Vec::new(),
            image: None,
            dockerfile: None,
            pull: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workflow {
    tasks: BTreeMap<TaskName, Arc<Task>>,
    arguments: Arguments,
    graph: Option<DagGraph>,
}

impl Workflow {
    /// Later tasks with a duplicate name replace earlier ones.
    pub fn new(tasks: impl IntoIterator<Item = Task>, arguments: Arguments) -> Self {
        let tasks = tasks
            .into_iter()
            .map(|t| (t.name.clone(), Arc::new(t)))
            .collect();
        Self {
            tasks,
            arguments,
            graph: None,
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values().map(Arc::as_ref)
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Workflow-level arguments from the document.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// The graph attached by the last [`Workflow::setup_graph`] call.
    pub fn graph(&self) -> Option<&DagGraph> {
        self.graph.as_ref()
    }

    /// Build the dependency graph, rejecting unknown requirements.
    pub fn setup_graph(&mut self) -> Result<()> {
        self.setup_graph_with(MissingDependencyPolicy::Reject)
    }

    /// Build and attach the dependency graph. Rebuilding replaces the
    /// previous graph; on error the previous graph is kept.
    pub fn setup_graph_with(&mut self, policy: MissingDependencyPolicy) -> Result<()> {
        let graph = DagGraph::build(self.tasks(), policy)?;
        debug!(
            vertices = graph.len(),
            phantoms = graph.phantoms().count(),
            "workflow graph built"
        );
        self.graph = Some(graph);
        Ok(())
    }

    /// Run every task once against one store and fold failures into a
    /// single error naming each failed and skipped task.
    pub async fn run(&self, context: RunContext, registries: &Registries) -> Result<()> {
        self.run_report(context, registries).await?.into_result()
    }

    /// Like [`Workflow::run`] but hands back the per-task report.
    pub async fn run_report(
        &self,
        context: RunContext,
        registries: &Registries,
    ) -> Result<RunReport> {
        let context = RunContext {
            arguments: self.arguments.merged(&context.arguments),
            ..context
        };
        info!(
            store = %context.store_path.display(),
            tasks = self.tasks.len(),
            "running workflow"
        );

        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
        let dispatcher = Dispatcher::from_registries(registries);
        let backend = RealExecutorBackend::new(rt_tx, dispatcher, context);
        self.run_with_backend(backend, rt_rx).await
    }

    /// Walk the graph with a caller-supplied backend. The backend must
    /// report every dispatched task on the sender paired with `events_rx`.
    pub async fn run_with_backend<E: ExecutorBackend>(
        &self,
        backend: E,
        events_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Result<RunReport> {
        let graph = match &self.graph {
            Some(g) => Cow::Borrowed(g),
            None => Cow::Owned(DagGraph::build(self.tasks(), MissingDependencyPolicy::Reject)?),
        };
        let scheduler = Scheduler::new(&graph, &self.tasks);
        Runtime::new(scheduler, events_rx, backend).run().await
    }
}
