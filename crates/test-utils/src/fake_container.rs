use std::path::{Path, PathBuf};
use std::sync::Mutex;

use forensicflow::errors::BackendError;
use forensicflow::exec::container::ClientFuture;
use forensicflow::exec::{ContainerClient, ContainerSpec, RegistryCredentials};

/// One call made against [`FakeContainerClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCall {
    Login(RegistryCredentials),
    Pull(String),
    Build { context: PathBuf, tag: String },
    Create(ContainerSpec),
    Start(String),
    Wait(String),
    Logs(String),
    Remove(String),
    ListImages,
}

/// In-memory container runtime that records every call.
///
/// Containers get ids `c1`, `c2`, ... in creation order.
#[derive(Default)]
pub struct FakeContainerClient {
    calls: Mutex<Vec<ContainerCall>>,
    created: Mutex<usize>,
    exit_status: i64,
    logs: Vec<String>,
    images: Vec<String>,
    fail_login: bool,
    fail_pull: bool,
    fail_build: bool,
    fail_start: bool,
}

impl FakeContainerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_status(mut self, status: i64) -> Self {
        self.exit_status = status;
        self
    }

    pub fn logs(mut self, lines: &[&str]) -> Self {
        self.logs = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn images(mut self, references: &[&str]) -> Self {
        self.images = references.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn fail_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn fail_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    pub fn fail_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn calls(&self) -> Vec<ContainerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ContainerCall::Create(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ContainerCall::Remove(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ContainerCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn fail_if(flag: bool, what: &str) -> Result<(), BackendError> {
        if flag {
            Err(BackendError::Container(format!("{what} rejected by fake")))
        } else {
            Ok(())
        }
    }
}

impl ContainerClient for FakeContainerClient {
    fn login<'a>(&'a self, credentials: &'a RegistryCredentials) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.record(ContainerCall::Login(credentials.clone()));
            Self::fail_if(self.fail_login, "login")
        })
    }

    fn pull<'a>(&'a self, image: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.record(ContainerCall::Pull(image.to_string()));
            Self::fail_if(self.fail_pull, "pull")
        })
    }

    fn build<'a>(&'a self, context: &'a Path, tag: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.record(ContainerCall::Build {
                context: context.to_path_buf(),
                tag: tag.to_string(),
            });
            Self::fail_if(self.fail_build, "build")
        })
    }

    fn create<'a>(&'a self, spec: &'a ContainerSpec) -> ClientFuture<'a, String> {
        Box::pin(async move {
            self.record(ContainerCall::Create(spec.clone()));
            let mut created = self.created.lock().unwrap();
            *created += 1;
            Ok(format!("c{}", *created))
        })
    }

    fn start<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.record(ContainerCall::Start(id.to_string()));
            Self::fail_if(self.fail_start, "start")
        })
    }

    fn wait<'a>(&'a self, id: &'a str) -> ClientFuture<'a, i64> {
        Box::pin(async move {
            self.record(ContainerCall::Wait(id.to_string()));
            Ok(self.exit_status)
        })
    }

    fn logs<'a>(&'a self, id: &'a str) -> ClientFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.record(ContainerCall::Logs(id.to_string()));
            Ok(self.logs.clone())
        })
    }

    fn remove<'a>(&'a self, id: &'a str) -> ClientFuture<'a, ()> {
        Box::pin(async move {
            self.record(ContainerCall::Remove(id.to_string()));
            Ok(())
        })
    }

    fn list_images(&self) -> ClientFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.record(ContainerCall::ListImages);
            Ok(self.images.clone())
        })
    }
}
