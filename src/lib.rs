// src/lib.rs

pub mod cli;
pub mod cmdline;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod store;
pub mod types;
pub mod workflow;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::cmdline::Arguments;
use crate::config::loader::load_with_policy;
use crate::engine::RunContext;
use crate::errors::ForensicflowError;
use crate::exec::{PluginRegistry, assemble_argv};
use crate::registry::{Registries, default_script_dir};
use crate::types::MissingDependencyPolicy;
use crate::workflow::Workflow;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    run_with_plugins(args, PluginRegistry::new()).await
}

/// Like [`run`], with in-process plugins available to `plugin` tasks.
///
/// This wires together:
/// - workflow loading and graph validation
/// - registry discovery (scripts, container images)
/// - one workflow run per store, in order
pub async fn run_with_plugins(args: CliArgs, plugins: PluginRegistry) -> Result<()> {
    let policy = if args.allow_phantom_deps {
        MissingDependencyPolicy::Phantom
    } else {
        MissingDependencyPolicy::Reject
    };
    let workflow = load_with_policy(&args.workflow, policy)
        .with_context(|| format!("loading workflow {}", args.workflow.display()))?;

    let extra = Arguments::from_passthrough(&args.passthrough)?;

    if args.dry_run {
        print_dry_run(&workflow, &extra);
        return Ok(());
    }

    let script_dir = args
        .script_dir
        .clone()
        .or_else(default_script_dir)
        .unwrap_or_else(|| PathBuf::from("scripts"));
    let plugin_dir = args
        .plugin_dir
        .clone()
        .unwrap_or_else(|| config_root_dir(&args.workflow));

    let registries = Registries::discover(&script_dir, plugins).await?;
    info!(
        scripts = registries.scripts.len(),
        plugins = registries.plugins.names().count(),
        images = registries.images.len(),
        "registries ready"
    );

    run_stores(&workflow, &args.stores, &plugin_dir, &extra, &registries).await
}

/// Run `workflow` once per store. A single store surfaces its error
/// unchanged; with several stores every store is attempted and failures
/// are summarised at the end.
async fn run_stores(
    workflow: &Workflow,
    stores: &[PathBuf],
    plugin_dir: &Path,
    extra: &Arguments,
    registries: &Registries,
) -> Result<()> {
    if let [store] = stores {
        let context = RunContext::new(store, plugin_dir).with_arguments(extra.clone());
        workflow.run(context, registries).await?;
        return Ok(());
    }

    let mut failed = Vec::new();
    for store in stores {
        let context = RunContext::new(store, plugin_dir).with_arguments(extra.clone());
        if let Err(err) = workflow.run(context, registries).await {
            error!(store = %store.display(), "{err}");
            failed.push(store.display().to_string());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(ForensicflowError::RuntimeError(format!(
            "workflow failed for {} of {} store(s): {}",
            failed.len(),
            stores.len(),
            failed.join(", ")
        ))
        .into())
    }
}

/// Directory of the workflow file, or the current directory for a bare
/// file name.
fn config_root_dir(workflow_path: &Path) -> PathBuf {
    match workflow_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print tasks in dependency order with the argv each would receive.
fn print_dry_run(workflow: &Workflow, extra: &Arguments) {
    let arguments = workflow.arguments().merged(extra);

    println!("forensicflow dry-run");
    if !arguments.is_empty() {
        println!("  arguments: {:?}", arguments.to_command_line());
    }
    println!();

    let order: Vec<&str> = workflow
        .graph()
        .map(|g| g.topological_order())
        .unwrap_or_default();

    println!("tasks ({}):", workflow.len());
    for name in order {
        let Some(task) = workflow.task(name) else {
            println!("  - {name} (phantom)");
            continue;
        };
        println!("  - {name}");
        println!("      type: {}", task.kind);
        println!("      command: {}", task.command);
        if let Some(ref image) = task.image {
            println!("      image: {image}");
        }
        if let Some(ref dockerfile) = task.dockerfile {
            println!("      dockerfile: {dockerfile}");
        }
        if task.pull {
            println!("      pull: true");
        }
        if !task.requires.is_empty() {
            println!("      requires: {:?}", task.requires);
        }
        println!("      argv: {:?}", assemble_argv(&arguments, task));
    }

    debug!("dry-run complete (no execution)");
}
