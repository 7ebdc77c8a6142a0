// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `RealExecutorBackend` runs each ready task on its own Tokio task via
//!   the [`Dispatcher`] and reports back with `RuntimeEvent::TaskCompleted`.
//! - Tests can provide their own `ExecutorBackend` that records which tasks
//!   were scheduled and emits completions directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::{RunContext, RuntimeEvent};
use crate::errors::{BackendError, ForensicflowError, Result, TaskError};
use crate::exec::dispatch::Dispatcher;
use crate::exec::invocation::Invocation;

/// Trait abstracting how scheduled tasks are executed.
///
/// Implementations must eventually send exactly one
/// `RuntimeEvent::TaskCompleted` per dispatched task; the runtime waits
/// for them.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatcher: Arc<Dispatcher>,
    context: Arc<RunContext>,
}

impl RealExecutorBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatcher: Dispatcher,
        context: RunContext,
    ) -> Self {
        Self {
            runtime_tx,
            dispatcher: Arc::new(dispatcher),
            context: Arc::new(context),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for scheduled in tasks {
                spawn_task(
                    scheduled,
                    Arc::clone(&self.dispatcher),
                    Arc::clone(&self.context),
                    self.runtime_tx.clone(),
                );
            }
            Ok(())
        })
    }
}

/// Run one task on its own Tokio task.
///
/// The work runs in an inner task so a panicking executor still produces a
/// failed completion instead of leaving the runtime waiting.
fn spawn_task(
    scheduled: ScheduledTask,
    dispatcher: Arc<Dispatcher>,
    context: Arc<RunContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let name = scheduled.name.clone();
    let kind = scheduled.task.kind;

    tokio::spawn(async move {
        let inner = tokio::spawn(async move {
            let invocation = Invocation::new(scheduled.task, context);
            dispatcher.execute(&invocation).await
        });

        let result = match inner.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(task = %name, error = %join_err, "task executor panicked");
                Err(TaskError::ExecutionFailure {
                    task: name.clone(),
                    kind,
                    cause: BackendError::Other(anyhow::anyhow!("executor panicked: {join_err}")),
                })
            }
        };

        if runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: name.clone(),
                result,
            })
            .await
            .is_err()
        {
            debug!(task = %name, "runtime gone; dropping completion");
        }
    });
}

impl From<mpsc::error::SendError<RuntimeEvent>> for ForensicflowError {
    fn from(err: mpsc::error::SendError<RuntimeEvent>) -> Self {
        ForensicflowError::RuntimeError(format!("sending runtime event: {err}"))
    }
}
