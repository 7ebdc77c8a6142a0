// src/exec/invocation.rs

use std::sync::Arc;

use crate::cmdline::Arguments;
use crate::engine::RunContext;
use crate::workflow::Task;

/// One task about to run, together with the run-wide inputs it needs.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub task: Arc<Task>,
    pub context: Arc<RunContext>,
}

impl Invocation {
    pub fn new(task: Arc<Task>, context: Arc<RunContext>) -> Self {
        Self { task, context }
    }

    /// Workflow arguments, then task arguments, then filter tokens.
    pub fn argv(&self) -> Vec<String> {
        assemble_argv(&self.context.arguments, &self.task)
    }
}

pub fn assemble_argv(workflow_args: &Arguments, task: &Task) -> Vec<String> {
    let mut argv = workflow_args.to_command_line();
    argv.extend(task.arguments.to_command_line());
    argv.extend(task.filter.to_command_line());
    argv
}
