// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime hands
//!   ready tasks to, and the `RealExecutorBackend` used in production.
//! - [`dispatch`] picks the executor for a task's kind and wraps backend
//!   errors into `TaskError::ExecutionFailure`.
//! - [`invocation`] assembles the argv a task receives.
//! - [`shell`], [`plugin`] and [`container`] are the executors;
//!   [`docker`] is the production container client.

pub mod backend;
pub mod container;
pub mod dispatch;
pub mod docker;
pub mod invocation;
pub mod plugin;
pub mod shell;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use container::{
    ContainerBuildExecutor, ContainerClient, ContainerExecutor, ContainerGuard, ContainerSpec,
    Mount, RegistryCredentials,
};
pub use dispatch::{Dispatcher, ExecFuture, TaskExecutor};
pub use docker::DockerCli;
pub use invocation::{Invocation, assemble_argv};
pub use plugin::{Plugin, PluginExecutor, PluginRegistry};
pub use shell::ShellExecutor;
