#![allow(dead_code)]

use forensicflow::cmdline::{Arguments, MatchGroup};
use forensicflow::types::{MissingDependencyPolicy, TaskKind};
use forensicflow::workflow::{Task, Workflow};

/// Builder for `Workflow` to simplify test setup.
pub struct WorkflowBuilder {
    tasks: Vec<Task>,
    arguments: Arguments,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            arguments: Arguments::new(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_argument(mut self, name: &str, value: &str) -> Self {
        self.arguments.push(name, value);
        self
    }

    /// Workflow without a graph attached.
    pub fn build_unchecked(self) -> Workflow {
        Workflow::new(self.tasks, self.arguments)
    }

    pub fn build(self) -> Workflow {
        let mut workflow = self.build_unchecked();
        workflow
            .setup_graph()
            .expect("Failed to build valid workflow from builder");
        workflow
    }

    pub fn build_with_phantoms(self) -> Workflow {
        let mut workflow = self.build_unchecked();
        workflow
            .setup_graph_with(MissingDependencyPolicy::Phantom)
            .expect("Failed to build workflow with phantom dependencies");
        workflow
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Task`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(name: &str, kind: TaskKind, command: &str) -> Self {
        Self {
            task: Task::new(name, kind, command),
        }
    }

    pub fn shell(name: &str, command: &str) -> Self {
        Self::new(name, TaskKind::Shell, command)
    }

    pub fn container(name: &str, command: &str) -> Self {
        Self::new(name, TaskKind::Container, command)
    }

    pub fn container_build(name: &str, command: &str) -> Self {
        Self::new(name, TaskKind::ContainerBuild, command)
    }

    pub fn plugin(name: &str, command: &str) -> Self {
        Self::new(name, TaskKind::Plugin, command)
    }

    pub fn requires(mut self, dep: &str) -> Self {
        self.task.requires.push(dep.to_string());
        self
    }

    pub fn arg(mut self, name: &str, value: &str) -> Self {
        self.task.arguments.push(name, value);
        self
    }

    pub fn filter_group(mut self, conditions: &[(&str, &str)]) -> Self {
        let group: MatchGroup = conditions.iter().copied().collect();
        self.task.filter.push(group);
        self
    }

    pub fn image(mut self, image: &str) -> Self {
        self.task.image = Some(image.to_string());
        self
    }

    pub fn dockerfile(mut self, dockerfile: &str) -> Self {
        self.task.dockerfile = Some(dockerfile.to_string());
        self
    }

    pub fn pull(mut self, val: bool) -> Self {
        self.task.pull = val;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
