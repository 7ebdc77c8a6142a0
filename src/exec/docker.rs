// src/exec/docker.rs

//! Production [`ContainerClient`] backed by the `docker` command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::errors::BackendError;
use crate::exec::container::{ClientFuture, ContainerClient, ContainerSpec, RegistryCredentials};

#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run one docker subcommand and return its stdout.
    async fn output(
        &self,
        args: Vec<OsString>,
        stdin: Option<&str>,
    ) -> Result<String, BackendError> {
        let subcommand = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(program = %self.program.display(), args = ?args, "running docker");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(BackendError::Container(format!(
                "docker {subcommand} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Arguments for `docker create`.
pub fn create_args(spec: &ContainerSpec) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "create".into(),
        "--tty".into(),
        "--workdir".into(),
        spec.working_dir.clone().into(),
    ];
    for mount in &spec.mounts {
        args.push("--mount".into());
        args.push(format!("type=bind,source={},target={}", mount.source, mount.target).into());
    }
    args.push(spec.image.clone().into());
    args.extend(spec.cmd.iter().map(OsString::from));
    args
}

fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

impl ContainerClient for DockerCli {
    fn login<'a>(&'a self, credentials: &'a RegistryCredentials) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            let mut args: Vec<OsString> = vec![
                "login".into(),
                "--username".into(),
                credentials.username.clone().into(),
                "--password-stdin".into(),
            ];
            if !credentials.server.is_empty() {
                args.push(credentials.server.clone().into());
            }
            self.output(args, Some(&credentials.password)).await?;
            Ok(())
        })
    }

    fn pull<'a>(&'a self, image: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            let out = self.output(vec!["pull".into(), image.into()], None).await?;
            for line in lines(&out) {
                debug!(image = %image, "{}", line);
            }
            Ok(())
        })
    }

    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            let args = vec![
                "build".into(),
                "--tag".into(),
                tag.into(),
                context.as_os_str().to_owned(),
            ];
            let out = self.output(args, None).await?;
            for line in lines(&out) {
                debug!(tag = %tag, "{}", line);
            }
            Ok(())
        })
    }

    fn create<'a>(&'a self, spec: &'a ContainerSpec) -> ClientFuture<'a, String> {
        Box::pin(async move {
            let out = self.output(create_args(spec), None).await?;
            let id = out.trim().to_string();
            if id.is_empty() {
                return Err(BackendError::Container(
                    "docker create returned no container id".to_string(),
                ));
            }
            Ok(id)
        })
    }

    fn start<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.output(vec!["start".into(), id.into()], None).await?;
            Ok(())
        })
    }

    fn wait<'a>(&'a self, id: &'a str) -> ClientFuture<'a, i64> {
        Box::pin(async move {
            let out = self.output(vec!["wait".into(), id.into()], None).await?;
            out.trim().parse::<i64>().map_err(|e| {
                BackendError::Container(format!("unexpected docker wait output {out:?}: {e}"))
            })
        })
    }

    fn logs<'a>(&'a self, id: &'a str) -> ClientFuture<'a, Vec<String>> {
        Box::pin(async move {
            let out = self.output(vec!["logs".into(), id.into()], None).await?;
            Ok(lines(&out))
        })
    }

    fn remove<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.output(vec!["rm".into(), "--force".into(), id.into()], None)
                .await?;
            Ok(())
        })
    }

    fn list_images(&self) -> ClientFuture<'_, Vec<String>> {
        Box::pin(async move {
            let args = vec![
                "images".into(),
                "--format".into(),
                "{{.Repository}}:{{.Tag}}".into(),
            ];
            let out = self.output(args, None).await?;
            Ok(lines(&out))
        })
    }
}
