// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::RawWorkflow;
use crate::config::validate::into_workflow;
use crate::errors::Result;
use crate::types::MissingDependencyPolicy;
use crate::workflow::Workflow;

/// Document encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Yaml,
}

impl DocumentFormat {
    /// `.yml` / `.yaml` are YAML; everything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Toml,
        }
    }
}

/// Parse a workflow document without semantic validation.
pub fn parse_str(contents: &str, format: DocumentFormat) -> Result<RawWorkflow> {
    let raw = match format {
        DocumentFormat::Toml => toml::from_str(contents)?,
        DocumentFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(raw)
}

/// Read and parse a workflow document. Use [`load_and_validate`] to also
/// check requirements and build the graph.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflow> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let format = DocumentFormat::from_path(path);
    debug!(path = %path.display(), ?format, "loading workflow document");
    parse_str(&contents, format)
}

/// Load, validate and build the graph, rejecting unknown requirements.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Workflow> {
    load_with_policy(path, MissingDependencyPolicy::Reject)
}

pub fn load_with_policy(
    path: impl AsRef<Path>,
    policy: MissingDependencyPolicy,
) -> Result<Workflow> {
    let raw = load_from_path(path)?;
    into_workflow(raw, policy)
}

/// `workflow.toml` in the current directory.
pub fn default_workflow_path() -> PathBuf {
    PathBuf::from("workflow.toml")
}
