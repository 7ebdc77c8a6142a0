// src/exec/container.rs

//! Container and ContainerBuild executors.
//!
//! Both run the task inside a container created from an image:
//! - the store directory is bind-mounted at `/store` (also the working
//!   directory) and the plugin directory at `/plugins`;
//! - a `file` argument has its parent directory mounted at `/transit` and
//!   is passed in as `--file <basename>`;
//! - registry credentials (`docker-user`, `docker-password`,
//!   `docker-server`) are used for login and never reach the container.
//!
//! The runtime itself sits behind [`ContainerClient`]; see
//! [`crate::exec::docker::DockerCli`] for the production client.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cmdline::Arguments;
use crate::errors::BackendError;
use crate::exec::dispatch::{ExecFuture, TaskExecutor};
use crate::exec::invocation::Invocation;
use crate::registry::ImageRegistry;
use crate::workflow::Task;

pub const STORE_MOUNT: &str = "/store";
pub const PLUGIN_MOUNT: &str = "/plugins";
pub const TRANSIT_MOUNT: &str = "/transit";

pub const FILE_ARG: &str = "file";
pub const USER_ARG: &str = "docker-user";
pub const PASSWORD_ARG: &str = "docker-password";
pub const SERVER_ARG: &str = "docker-server";

const CONSUMED_ARGS: [&str; 4] = [FILE_ARG, USER_ARG, PASSWORD_ARG, SERVER_ARG];

pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// A bind mount from a host path to a container path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: String,
    pub target: String,
}

impl Mount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Everything needed to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub cmd: Vec<String>,
    pub mounts: Vec<Mount>,
    pub working_dir: String,
}

impl ContainerSpec {
    pub fn mount_for(&self, target: &str) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.target == target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub server: String,
}

impl RegistryCredentials {
    /// Credentials from the task arguments, falling back to the workflow
    /// arguments. `None` when no user name is given.
    pub fn from_invocation(invocation: &Invocation) -> Option<Self> {
        let lookup = |key: &str| {
            lookup_argument(&invocation.task.arguments, &invocation.context.arguments, key)
        };
        let username = lookup(USER_ARG)?;
        Some(Self {
            username,
            password: lookup(PASSWORD_ARG).unwrap_or_default(),
            server: lookup(SERVER_ARG).unwrap_or_default(),
        })
    }
}

/// Operations the executors need from a container runtime.
pub trait ContainerClient: Send + Sync {
    fn login<'a>(&'a self, credentials: &'a RegistryCredentials) -> ClientFuture<'a, ()>;

    fn pull<'a>(&'a self, image: &'a str) -> ClientFuture<'a, ()>;

    /// Build `context` and tag the result as `tag`.
    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> ClientFuture<'a, ()>;

    /// Returns the container id.
    fn create<'a>(&'a self, spec: &'a ContainerSpec) -> ClientFuture<'a, String>;

    fn start<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()>;

    /// Block until the container is no longer running; returns its exit status.
    fn wait<'a>(&'a self, id: &'a str) -> ClientFuture<'a, i64>;

    fn logs<'a>(&'a self, id: &'a str) -> ClientFuture<'a, Vec<String>>;

    fn remove<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()>;

    /// Local image references as `repository:tag`.
    fn list_images(&self) -> ClientFuture<'_, Vec<String>>;
}

/// Removes the container when released or dropped.
///
/// Dropping without [`ContainerGuard::release`] (e.g. when the task future is
/// cancelled) spawns the removal onto the current Tokio runtime.
pub struct ContainerGuard {
    client: Arc<dyn ContainerClient>,
    id: Option<String>,
}

impl ContainerGuard {
    pub fn new(client: Arc<dyn ContainerClient>, id: String) -> Self {
        Self {
            client,
            id: Some(id),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub async fn release(mut self) {
        if let Some(id) = self.id.take() {
            remove_logged(self.client.as_ref(), &id).await;
        }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(&self.client);
                handle.spawn(async move {
                    remove_logged(client.as_ref(), &id).await;
                });
            }
            Err(_) => warn!(container = %id, "no runtime available; container left behind"),
        }
    }
}

async fn remove_logged(client: &dyn ContainerClient, id: &str) {
    match client.remove(id).await {
        Ok(()) => debug!(container = %id, "container removed"),
        Err(e) => warn!(container = %id, error = %e, "failed to remove container"),
    }
}

/// Runs a pre-built image.
#[derive(Clone)]
pub struct ContainerExecutor {
    client: Arc<dyn ContainerClient>,
    images: ImageRegistry,
}

impl ContainerExecutor {
    pub fn new(client: Arc<dyn ContainerClient>, images: ImageRegistry) -> Self {
        Self { client, images }
    }

    /// Image reference and in-container command prefix for `task`.
    ///
    /// With an explicit `image` the command is the program run inside it;
    /// otherwise the command names the image.
    pub fn resolve_image(&self, task: &Task) -> (String, Vec<String>) {
        match &task.image {
            Some(image) => (image.clone(), split_command(&task.command)),
            None => (self.images.resolve(&task.command), Vec::new()),
        }
    }

    /// The shared create/start/wait/logs sequence. With `pull` set the
    /// image is fetched from its registry first.
    pub async fn run_container(
        &self,
        invocation: &Invocation,
        image: &str,
        cmd_prefix: Vec<String>,
        pull: bool,
    ) -> Result<(), BackendError> {
        let task = &invocation.task;
        if pull {
            self.authenticate_and_pull(invocation, image).await?;
        }
        ensure_store_dir(&invocation.context.store_path).await?;

        let spec = container_spec(invocation, image, cmd_prefix)?;
        info!(
            task = %task.name,
            image = %spec.image,
            cmd = ?spec.cmd,
            "creating container"
        );

        let id = self.client.create(&spec).await?;
        let guard = ContainerGuard::new(Arc::clone(&self.client), id);
        let result = self.start_and_wait(&task.name, guard.id()).await;
        guard.release().await;
        result
    }

    async fn authenticate_and_pull(
        &self,
        invocation: &Invocation,
        image: &str,
    ) -> Result<(), BackendError> {
        if let Some(credentials) = RegistryCredentials::from_invocation(invocation) {
            debug!(server = %credentials.server, user = %credentials.username, "registry login");
            self.client
                .login(&credentials)
                .await
                .map_err(|e| BackendError::AuthenticationFailure(e.to_string()))?;
        }

        info!(task = %invocation.task.name, image = %image, "pulling image");
        self.client
            .pull(image)
            .await
            .map_err(|e| BackendError::PullFailure {
                image: image.to_string(),
                reason: e.to_string(),
            })
    }

    async fn start_and_wait(&self, task: &str, id: &str) -> Result<(), BackendError> {
        self.client.start(id).await?;
        let status = self.client.wait(id).await?;

        for line in self.client.logs(id).await? {
            info!(task = %task, "{}", line);
        }

        debug!(task = %task, container = %id, status, "container stopped");
        if status == 0 {
            Ok(())
        } else {
            Err(BackendError::ContainerExit { status })
        }
    }
}

impl TaskExecutor for ContainerExecutor {
    fn execute<'a>(&'a self, invocation: &'a Invocation) -> ExecFuture<'a> {
        Box::pin(async move {
            let (image, prefix) = self.resolve_image(&invocation.task);
            self.run_container(invocation, &image, prefix, invocation.task.pull).await
        })
    }
}

/// Builds an image from a context directory, then runs it like
/// [`ContainerExecutor`].
#[derive(Clone)]
pub struct ContainerBuildExecutor {
    runner: ContainerExecutor,
}

impl ContainerBuildExecutor {
    pub fn new(runner: ContainerExecutor) -> Self {
        Self { runner }
    }
}

impl TaskExecutor for ContainerBuildExecutor {
    fn execute<'a>(&'a self, invocation: &'a Invocation) -> ExecFuture<'a> {
        Box::pin(async move {
            let task = &invocation.task;
            let (context, prefix) = match &task.dockerfile {
                Some(dockerfile) => (dockerfile.as_str(), split_command(&task.command)),
                None => (task.command.as_str(), Vec::new()),
            };
            let context = build_context_path(context, &invocation.context.plugin_dir);
            let tag = build_tag(&task.name);

            info!(task = %task.name, context = %context.display(), tag = %tag, "building image");
            self.runner
                .client
                .build(&context, &tag)
                .await
                .map_err(|e| BackendError::BuildFailure {
                    context: context.display().to_string(),
                    reason: e.to_string(),
                })?;

            // The tag only exists locally.
            self.runner.run_container(invocation, &tag, prefix, false).await
        })
    }
}

/// Assemble the container spec for `invocation`.
///
/// The argv is the regular workflow/task/filter argv minus the `file` and
/// credential arguments, followed by `--file <basename>` when a `file`
/// argument is set.
pub fn container_spec(
    invocation: &Invocation,
    image: &str,
    cmd_prefix: Vec<String>,
) -> std::io::Result<ContainerSpec> {
    let context = &invocation.context;
    let task = &invocation.task;

    let mut mounts = vec![
        Mount::new(host_path(&context.store_path)?, STORE_MOUNT),
        Mount::new(host_path(&context.plugin_dir)?, PLUGIN_MOUNT),
    ];

    let mut cmd = cmd_prefix;
    cmd.extend(context.arguments.without(&CONSUMED_ARGS).to_command_line());
    cmd.extend(task.arguments.without(&CONSUMED_ARGS).to_command_line());
    cmd.extend(task.filter.to_command_line());

    if let Some(file) = lookup_argument(&task.arguments, &context.arguments, FILE_ARG) {
        let (dir, name) = split_transit_path(&file);
        mounts.push(Mount::new(host_path(&dir)?, TRANSIT_MOUNT));
        cmd.push(format!("--{FILE_ARG}"));
        cmd.push(name);
    }

    Ok(ContainerSpec {
        image: image.to_string(),
        cmd,
        mounts,
        working_dir: STORE_MOUNT.to_string(),
    })
}

/// Rewrite a drive-letter path (`C:\x\y`) to POSIX form (`/c/x/y`).
/// Other paths are returned unchanged.
pub fn posix_host_path(path: &str) -> String {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        format!("/{drive}{}", path[2..].replace('\\', "/"))
    } else {
        path.to_string()
    }
}

/// Absolute, POSIX-style host path suitable as a bind-mount source.
fn host_path(path: &Path) -> std::io::Result<String> {
    let raw = path.to_string_lossy();
    if is_drive_path(&raw) {
        return Ok(posix_host_path(&raw));
    }
    let path = if raw.is_empty() { Path::new(".") } else { path };
    Ok(posix_host_path(&std::path::absolute(path)?.to_string_lossy()))
}

fn is_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Parent directory and file name of a `file` argument. Both `/` and `\`
/// separate components so drive-letter paths split on any host.
fn split_transit_path(file: &str) -> (PathBuf, String) {
    match file.rfind(['/', '\\']) {
        Some(0) => (PathBuf::from("/"), file[1..].to_string()),
        Some(idx) => (PathBuf::from(&file[..idx]), file[idx + 1..].to_string()),
        None => (PathBuf::from("."), file.to_string()),
    }
}

fn lookup_argument(task: &Arguments, workflow: &Arguments, key: &str) -> Option<String> {
    task.get(key)
        .or_else(|| workflow.get(key))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn build_context_path(context: &str, plugin_dir: &Path) -> PathBuf {
    let path = Path::new(context);
    if path.is_absolute() || is_drive_path(context) {
        path.to_path_buf()
    } else {
        plugin_dir.join(path)
    }
}

/// Image tag for a task's build: lowercase, restricted to `[a-z0-9_.-]`.
pub fn build_tag(task: &str) -> String {
    let name: String = task
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '_' | '.' | '-') => c,
            _ => '-',
        })
        .collect();
    format!("forensicflow-build-{name}")
}

async fn ensure_store_dir(store: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(store).await? {
        return Ok(());
    }
    info!(store = %store.display(), "creating store directory");
    tokio::fs::create_dir_all(store).await
}
