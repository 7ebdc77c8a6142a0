// src/config/validate.rs

use crate::config::model::{RawWorkflow, TaskConfig};
use crate::errors::{ForensicflowError, Result};
use crate::types::{MissingDependencyPolicy, TaskKind};
use crate::workflow::{Task, Workflow};

impl TryFrom<RawWorkflow> for Workflow {
    type Error = ForensicflowError;

    fn try_from(raw: RawWorkflow) -> std::result::Result<Self, Self::Error> {
        into_workflow(raw, MissingDependencyPolicy::Reject)
    }
}

/// Validate `raw` and build its graph under `policy`.
pub fn into_workflow(raw: RawWorkflow, policy: MissingDependencyPolicy) -> Result<Workflow> {
    validate_raw_workflow(&raw)?;

    let tasks = raw
        .tasks
        .into_iter()
        .map(|(name, cfg)| task_from_config(name, cfg));
    let mut workflow = Workflow::new(tasks, raw.arguments);
    workflow.setup_graph_with(policy)?;
    Ok(workflow)
}

fn task_from_config(name: String, cfg: TaskConfig) -> Task {
    Task {
        name,
        kind: cfg.kind,
        command: cfg.command.trim().to_string(),
        arguments: cfg.arguments,
        filter: cfg.filter,
        requires: cfg.requires,
        image: cfg.image.filter(|s| !s.trim().is_empty()),
        dockerfile: cfg.dockerfile.filter(|s| !s.trim().is_empty()),
        pull: cfg.pull,
    }
}

fn validate_raw_workflow(raw: &RawWorkflow) -> Result<()> {
    ensure_has_tasks(raw)?;
    for (name, task) in &raw.tasks {
        validate_task(name, task)?;
    }
    Ok(())
}

fn ensure_has_tasks(raw: &RawWorkflow) -> Result<()> {
    if raw.tasks.is_empty() {
        return Err(ForensicflowError::ConfigError(
            "workflow must contain at least one [tasks.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &TaskConfig) -> Result<()> {
    let has = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());

    if task.command.trim().is_empty() && !has(&task.image) && !has(&task.dockerfile) {
        return Err(ForensicflowError::ConfigError(format!(
            "task '{name}' has an empty `command`"
        )));
    }
    if has(&task.image) && task.kind != TaskKind::Container {
        return Err(ForensicflowError::ConfigError(format!(
            "task '{name}': `image` is only valid for container tasks (type is {})",
            task.kind
        )));
    }
    if has(&task.dockerfile) && task.kind != TaskKind::ContainerBuild {
        return Err(ForensicflowError::ConfigError(format!(
            "task '{name}': `dockerfile` is only valid for containerbuild tasks (type is {})",
            task.kind
        )));
    }
    if task.pull && task.kind != TaskKind::Container {
        return Err(ForensicflowError::ConfigError(format!(
            "task '{name}': `pull` is only valid for container tasks (type is {})",
            task.kind
        )));
    }
    Ok(())
}
