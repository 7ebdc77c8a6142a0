use std::fmt;

use serde::Deserialize;

/// Execution backend a task is dispatched to.
///
/// The workflow document spells these in lowercase. The aliases accept the
/// older `bash` / `docker` / `dockerfile` spellings found in existing
/// workflow files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum TaskKind {
    /// Discovered script run through a POSIX shell.
    #[serde(rename = "shell", alias = "bash", alias = "script")]
    Shell,
    /// Pre-built container image.
    #[serde(rename = "container", alias = "docker")]
    Container,
    /// Image built from a build context, then run like `Container`.
    #[serde(rename = "containerbuild", alias = "dockerfile")]
    ContainerBuild,
    /// In-process command handler.
    #[serde(rename = "plugin")]
    Plugin,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Shell => "shell",
            TaskKind::Container => "container",
            TaskKind::ContainerBuild => "containerbuild",
            TaskKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a `requires` entry that names no task.
///
/// - `Reject`: fail graph construction with
///   [`ForensicflowError::UnknownDependency`](crate::errors::ForensicflowError::UnknownDependency).
/// - `Phantom`: add a task-less vertex for the name. Phantom vertices
///   never reach an executor and count as succeeded once their own
///   requirements are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingDependencyPolicy {
    #[default]
    Reject,
    Phantom,
}
