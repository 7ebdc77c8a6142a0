// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::cmdline::{Arguments, Filter};
use crate::types::TaskKind;

/// A workflow document as read from TOML or YAML, before validation.
///
/// ```toml
/// [arguments]
/// docker-server = "registry.example"
///
/// [tasks.cwd]
/// type = "shell"
/// command = "forensicstore-cwd"
///
/// [tasks.plaso]
/// type = "docker"
/// command = "forensicstore-plaso"
/// requires = ["cwd"]
/// pull = true
///
/// [tasks.plaso.with]
/// file = "/evidence/disk.E01"
///
/// [[tasks.plaso.filter]]
/// type = "file"
/// ```
///
/// YAML documents use the same keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWorkflow {
    /// Workflow-level arguments, passed to every task.
    #[serde(default)]
    pub arguments: Arguments,

    /// All tasks from `[tasks.<name>]`, keyed by task name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

/// One `[tasks.<name>]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(rename = "type")]
    pub kind: TaskKind,

    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub requires: Vec<String>,

    /// Task-level arguments (`with` in the document).
    #[serde(default, rename = "with")]
    pub arguments: Arguments,

    #[serde(default)]
    pub filter: Filter,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default)]
    pub pull: bool,
}
