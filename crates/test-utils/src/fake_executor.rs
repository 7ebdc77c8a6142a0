use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use forensicflow::dag::ScheduledTask;
use forensicflow::engine::RuntimeEvent;
use forensicflow::errors::{BackendError, Result, TaskError};
use forensicflow::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were "run", and in which dispatch batch
/// - immediately reports TaskCompleted for each scheduled task, failing
///   the ones named in `failing` with exit code 1.
pub struct RecordingBackend {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    failing: BTreeSet<String>,
}

impl RecordingBackend {
    pub fn new(runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            executed: Arc::new(Mutex::new(Vec::new())),
            batches: Arc::new(Mutex::new(Vec::new())),
            failing: BTreeSet::new(),
        }
    }

    pub fn failing(mut self, tasks: &[&str]) -> Self {
        self.failing.extend(tasks.iter().map(|t| t.to_string()));
        self
    }

    /// Shared handle to the execution log, in dispatch order.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    /// Shared handle to the dispatch batches.
    pub fn batches(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.batches)
    }
}

impl ExecutorBackend for RecordingBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        self.batches
            .lock()
            .unwrap()
            .push(tasks.iter().map(|t| t.name.clone()).collect());

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let result = if self.failing.contains(&t.name) {
                    Err(TaskError::ExecutionFailure {
                        task: t.name.clone(),
                        kind: t.task.kind,
                        cause: BackendError::NonZeroExit { code: 1 },
                    })
                } else {
                    Ok(())
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    result,
                })
                .await?;
            }
            Ok(())
        })
    }
}
