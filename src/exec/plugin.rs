// src/exec/plugin.rs

//! In-process command handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::BackendError;
use crate::exec::dispatch::{ExecFuture, TaskExecutor};
use crate::exec::invocation::Invocation;
use crate::types::TaskKind;

/// A command handler that owns its own I/O and receives the assembled argv.
pub trait Plugin: Send + Sync {
    fn run(&self, args: &[String]) -> anyhow::Result<()>;
}

impl<F> Plugin for F
where
    F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self, args: &[String]) -> anyhow::Result<()> {
        self(args)
    }
}

/// Name to handler lookup table. Read-only during a run.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, plugin: impl Plugin + 'static) {
        self.plugins.insert(name.into(), Arc::new(plugin));
    }

    pub fn with(mut self, name: impl Into<String>, plugin: impl Plugin + 'static) -> Self {
        self.register(name, plugin);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.plugins.keys()).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PluginExecutor {
    plugins: PluginRegistry,
}

impl PluginExecutor {
    pub fn new(plugins: PluginRegistry) -> Self {
        Self { plugins }
    }
}

impl TaskExecutor for PluginExecutor {
    fn execute<'a>(&'a self, invocation: &'a Invocation) -> ExecFuture<'a> {
        Box::pin(async move {
            let command = &invocation.task.command;
            let plugin = self
                .plugins
                .get(command)
                .ok_or_else(|| BackendError::CommandNotFound {
                    kind: TaskKind::Plugin,
                    command: command.clone(),
                })?;

            let argv = invocation.argv();
            debug!(task = %invocation.task.name, plugin = %command, args = ?argv, "running plugin");

            // Handlers block; keep them off the runtime's worker threads.
            tokio::task::spawn_blocking(move || plugin.run(&argv))
                .await
                .map_err(|e| BackendError::Other(anyhow::anyhow!("plugin panicked: {e}")))??;
            Ok(())
        })
    }
}
