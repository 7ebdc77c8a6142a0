// src/exec/dispatch.rs

//! Kind-based dispatch to the executor backends.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{BackendError, TaskError};
use crate::exec::container::{ContainerBuildExecutor, ContainerExecutor};
use crate::exec::invocation::Invocation;
use crate::exec::plugin::PluginExecutor;
use crate::exec::shell::ShellExecutor;
use crate::registry::Registries;
use crate::types::TaskKind;

pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BackendError>> + Send + 'a>>;

/// Runs one task's command in one execution environment.
pub trait TaskExecutor: Send + Sync {
    fn execute<'a>(&'a self, invocation: &'a Invocation) -> ExecFuture<'a>;
}

/// Holds one executor per [`TaskKind`].
pub struct Dispatcher {
    shell: Arc<dyn TaskExecutor>,
    container: Arc<dyn TaskExecutor>,
    container_build: Arc<dyn TaskExecutor>,
    plugin: Arc<dyn TaskExecutor>,
}

impl Dispatcher {
    pub fn new(
        shell: Arc<dyn TaskExecutor>,
        container: Arc<dyn TaskExecutor>,
        container_build: Arc<dyn TaskExecutor>,
        plugin: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            shell,
            container,
            container_build,
            plugin,
        }
    }

    /// Production executors over a registry snapshot.
    pub fn from_registries(registries: &Registries) -> Self {
        let container = ContainerExecutor::new(
            Arc::clone(&registries.containers),
            registries.images.clone(),
        );
        Self::new(
            Arc::new(ShellExecutor::new(registries.scripts.clone())),
            Arc::new(container.clone()),
            Arc::new(ContainerBuildExecutor::new(container)),
            Arc::new(PluginExecutor::new(registries.plugins.clone())),
        )
    }

    pub fn executor_for(&self, kind: TaskKind) -> &dyn TaskExecutor {
        match kind {
            TaskKind::Shell => self.shell.as_ref(),
            TaskKind::Container => self.container.as_ref(),
            TaskKind::ContainerBuild => self.container_build.as_ref(),
            TaskKind::Plugin => self.plugin.as_ref(),
        }
    }

    /// Run `invocation` and wrap any backend error as
    /// [`TaskError::ExecutionFailure`].
    pub async fn execute(&self, invocation: &Invocation) -> Result<(), TaskError> {
        let task = &invocation.task;
        info!(task = %task.name, kind = %task.kind, command = %task.command, "starting task");

        self.executor_for(task.kind)
            .execute(invocation)
            .await
            .map_err(|cause| TaskError::ExecutionFailure {
                task: task.name.clone(),
                kind: task.kind,
                cause,
            })?;

        debug!(task = %task.name, "task backend returned success");
        Ok(())
    }
}
