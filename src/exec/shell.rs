// src/exec/shell.rs

//! Shell executor: runs a discovered script through `sh` inside the store
//! directory.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::BackendError;
use crate::exec::dispatch::{ExecFuture, TaskExecutor};
use crate::exec::invocation::Invocation;
use crate::registry::ScriptRegistry;
use crate::types::TaskKind;

#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    scripts: ScriptRegistry,
}

impl ShellExecutor {
    pub fn new(scripts: ScriptRegistry) -> Self {
        Self { scripts }
    }
}

impl TaskExecutor for ShellExecutor {
    fn execute<'a>(&'a self, invocation: &'a Invocation) -> ExecFuture<'a> {
        Box::pin(async move {
            let command = &invocation.task.command;
            let script = self
                .scripts
                .get(command)
                .ok_or_else(|| BackendError::CommandNotFound {
                    kind: TaskKind::Shell,
                    command: command.clone(),
                })?;

            run_script(
                &invocation.task.name,
                script,
                &invocation.argv(),
                &invocation.context.store_path,
            )
            .await
        })
    }
}

/// Run `script` with `argv` as positional parameters.
///
/// Stdout is inherited; stderr is read line by line into the log.
pub async fn run_script(
    task: &str,
    script: &Path,
    argv: &[String],
    working_dir: &Path,
) -> Result<(), BackendError> {
    info!(task = %task, script = %script.display(), args = ?argv, "starting shell process");

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(r#"exec "$0" "$@""#)
        .arg(script)
        .args(argv)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let stderr_reader = child.stderr.take().map(|stderr| {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "{}", line);
            }
        })
    });

    let status = child.wait().await?;

    if let Some(reader) = stderr_reader
        && let Err(e) = reader.await
    {
        warn!(task = %task, error = %e, "stderr reader stopped unexpectedly");
    }

    let code = status.code().unwrap_or(-1);
    debug!(task = %task, exit_code = code, success = status.success(), "shell process exited");

    if status.success() {
        Ok(())
    } else {
        Err(BackendError::NonZeroExit { code })
    }
}
