// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_workflow_path;

/// Command-line arguments for `forensicflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "forensicflow",
    version,
    about = "Run a DAG of forensic analysis tasks against evidence stores.",
    long_about = None
)]
pub struct CliArgs {
    /// Workflow document (TOML, or YAML for `.yml`/`.yaml`).
    #[arg(
        long,
        short = 'w',
        value_name = "FILE",
        default_value_os_t = default_workflow_path()
    )]
    pub workflow: PathBuf,

    /// Directory mounted at `/plugins` in containers.
    ///
    /// Default: the directory containing the workflow file.
    #[arg(long, value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Directory scanned for `forensicstore-*` scripts.
    ///
    /// Default: `<user config dir>/forensicstore/scripts`.
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Treat `requires` entries naming no task as already satisfied
    /// instead of rejecting the workflow.
    #[arg(long)]
    pub allow_phantom_deps: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORENSICFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan, but don't execute any task.
    #[arg(long)]
    pub dry_run: bool,

    /// Evidence stores to run the workflow against, one after another.
    #[arg(value_name = "STORE", required_unless_present = "dry_run")]
    pub stores: Vec<PathBuf>,

    /// Extra workflow arguments, e.g. `-- --docker-user me --file x.dat`.
    #[arg(last = true, value_name = "ARGS")]
    pub passthrough: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
