// tests/container_executor.rs

use std::sync::Arc;

use tempfile::TempDir;

use forensicflow::engine::RunContext;
use forensicflow::errors::{BackendError, TaskError};
use forensicflow::exec::container::{PLUGIN_MOUNT, STORE_MOUNT, TRANSIT_MOUNT, container_spec};
use forensicflow::exec::{ContainerClient, Dispatcher, Invocation, RegistryCredentials};
use forensicflow::registry::{ImageRegistry, Registries};
use forensicflow::types::TaskKind;
use forensicflow::workflow::Task;
use forensicflow_test_utils::builders::TaskBuilder;
use forensicflow_test_utils::fake_container::{ContainerCall, FakeContainerClient};
use forensicflow_test_utils::{init_tracing, with_timeout};

struct Fixture {
    store: TempDir,
    plugins: TempDir,
    client: Arc<FakeContainerClient>,
    dispatcher: Dispatcher,
}

fn fixture(client: FakeContainerClient) -> Fixture {
    let client = Arc::new(client);
    let as_client: Arc<dyn ContainerClient> = client.clone();
    let images = ImageRegistry::from_references(["registry.example/forensicstore-plaso:v2"]);
    let dispatcher = Dispatcher::from_registries(&Registries::new(as_client).with_images(images));
    Fixture {
        store: tempfile::tempdir().unwrap(),
        plugins: tempfile::tempdir().unwrap(),
        client,
        dispatcher,
    }
}

impl Fixture {
    fn context(&self) -> RunContext {
        RunContext::new(self.store.path(), self.plugins.path())
    }

    fn invocation(&self, task: Task) -> Invocation {
        Invocation::new(Arc::new(task), Arc::new(self.context()))
    }
}

fn path_str(dir: &TempDir) -> String {
    std::path::absolute(dir.path())
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

#[test]
fn file_argument_is_mounted_at_transit_and_rewritten() {
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container("import", "forensicstore-import")
        .arg("file", "/host/evidence.dat")
        .arg("format", "raw")
        .build();

    let spec = container_spec(&fx.invocation(task), "forensicstore-import", Vec::new()).unwrap();

    assert_eq!(spec.mount_for(TRANSIT_MOUNT).unwrap().source, "/host");
    assert_eq!(spec.mount_for(STORE_MOUNT).unwrap().source, path_str(&fx.store));
    assert_eq!(spec.mount_for(PLUGIN_MOUNT).unwrap().source, path_str(&fx.plugins));
    assert_eq!(spec.working_dir, "/store");
    assert_eq!(spec.cmd, vec!["--format", "raw", "--file", "evidence.dat"]);
    assert!(!spec.cmd.iter().any(|a| a.contains("/host")));
}

#[test]
fn drive_letter_file_paths_are_mounted_posix_style() {
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container("import", "forensicstore-import")
        .arg("file", r"C:\cases\disk.E01")
        .build();

    let spec = container_spec(&fx.invocation(task), "img", Vec::new()).unwrap();
    assert_eq!(spec.mount_for(TRANSIT_MOUNT).unwrap().source, "/c/cases");
    assert_eq!(spec.cmd, vec!["--file", "disk.E01"]);
}

#[test]
fn credentials_never_reach_container_argv() {
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso")
        .arg("docker-user", "alice")
        .arg("docker-password", "s3cret")
        .arg("parsers", "winreg")
        .build();
    let context = fx
        .context()
        .with_arguments([("docker-server", "registry.example")].into_iter().collect());
    let inv = Invocation::new(Arc::new(task), Arc::new(context));

    let spec = container_spec(&inv, "img", Vec::new()).unwrap();
    assert_eq!(spec.cmd, vec!["--parsers", "winreg"]);
    assert!(spec.mount_for(TRANSIT_MOUNT).is_none());

    assert_eq!(
        RegistryCredentials::from_invocation(&inv),
        Some(RegistryCredentials {
            username: "alice".into(),
            password: "s3cret".into(),
            server: "registry.example".into(),
        })
    );
}

#[tokio::test]
async fn container_runs_and_is_removed() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().logs(&["parsing", "done"]));
    let task = TaskBuilder::container("plaso", "forensicstore-plaso")
        .filter_group(&[("type", "file")])
        .build();

    with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap();

    let calls = fx.client.calls();
    let ContainerCall::Create(spec) = &calls[0] else {
        panic!("expected create first, got {calls:?}");
    };
    assert_eq!(spec.image, "registry.example/forensicstore-plaso:v2");
    assert_eq!(spec.cmd, vec!["--filter", "type=file"]);
    assert_eq!(
        calls[1..],
        [
            ContainerCall::Start("c1".into()),
            ContainerCall::Wait("c1".into()),
            ContainerCall::Logs("c1".into()),
            ContainerCall::Remove("c1".into()),
        ]
    );
}

#[tokio::test]
async fn non_zero_status_fails_and_still_removes() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().exit_status(2));
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").build();

    match with_timeout(fx.dispatcher.execute(&fx.invocation(task))).await {
        Err(TaskError::ExecutionFailure {
            kind: TaskKind::Container,
            cause: BackendError::ContainerExit { status: 2 },
            ..
        }) => {}
        other => panic!("expected ContainerExit(2), got {other:?}"),
    }
    assert_eq!(fx.client.removed(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn start_error_still_removes_container() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().fail_start());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").build();

    let err = with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskError::ExecutionFailure { cause: BackendError::Container(_), .. }
    ));
    assert_eq!(fx.client.removed(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn pull_logs_in_with_credentials_first() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container("yara", "scan --rules /plugins/rules")
        .image("registry.example/forensicstore-yara:1")
        .arg("docker-user", "alice")
        .arg("docker-password", "pw")
        .pull(true)
        .build();

    with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap();

    let calls = fx.client.calls();
    assert!(matches!(&calls[0], ContainerCall::Login(c) if c.username == "alice"));
    assert_eq!(calls[1], ContainerCall::Pull("registry.example/forensicstore-yara:1".into()));
    let spec = &fx.client.created_specs()[0];
    assert_eq!(spec.image, "registry.example/forensicstore-yara:1");
    assert_eq!(spec.cmd, vec!["scan", "--rules", "/plugins/rules"]);
}

#[tokio::test]
async fn pull_without_credentials_skips_login() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").pull(true).build();

    with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap();
    assert!(!fx.client.calls().iter().any(|c| matches!(c, ContainerCall::Login(_))));
}

#[tokio::test]
async fn pull_failure_is_fatal_before_create() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().fail_pull());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").pull(true).build();

    let err = with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskError::ExecutionFailure { cause: BackendError::PullFailure { .. }, .. }
    ));
    assert!(fx.client.created_specs().is_empty());
}

#[tokio::test]
async fn login_failure_is_authentication_failure() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().fail_login());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso")
        .arg("docker-user", "alice")
        .pull(true)
        .build();

    let err = with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskError::ExecutionFailure { cause: BackendError::AuthenticationFailure(_), .. }
    ));
    assert!(!fx.client.calls().iter().any(|c| matches!(c, ContainerCall::Pull(_))));
}

#[tokio::test]
async fn build_then_run_built_image() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container_build("jq", "echo Dockerfile")
        .dockerfile("jq")
        .build();

    with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap();

    let calls = fx.client.calls();
    assert_eq!(
        calls[0],
        ContainerCall::Build {
            context: fx.plugins.path().join("jq"),
            tag: "forensicflow-build-jq".into(),
        }
    );
    let spec = &fx.client.created_specs()[0];
    assert_eq!(spec.image, "forensicflow-build-jq");
    assert_eq!(spec.cmd, vec!["echo", "Dockerfile"]);
    assert_eq!(fx.client.removed(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn built_image_is_never_pulled() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new());
    let task = TaskBuilder::container_build("jq", "echo hi")
        .dockerfile("jq")
        .pull(true)
        .build();

    with_timeout(fx.dispatcher.execute(&fx.invocation(task)))
        .await
        .unwrap();

    let calls = fx.client.calls();
    assert!(!calls.iter().any(|c| matches!(c, ContainerCall::Pull(_))));
    assert_eq!(fx.client.created_specs()[0].image, "forensicflow-build-jq");
}

#[tokio::test]
async fn failed_pull_leaves_no_store_directory() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().fail_pull());
    let store = fx.store.path().join("new-case");
    let context = RunContext::new(&store, fx.plugins.path());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").pull(true).build();
    let inv = Invocation::new(Arc::new(task), Arc::new(context));

    let err = with_timeout(fx.dispatcher.execute(&inv)).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::ExecutionFailure { cause: BackendError::PullFailure { .. }, .. }
    ));
    assert!(!store.exists());
}

#[tokio::test]
async fn build_failure_aborts_before_any_container() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new().fail_build());
    let task = TaskBuilder::container_build("jq", "jq").build();

    match with_timeout(fx.dispatcher.execute(&fx.invocation(task))).await {
        Err(TaskError::ExecutionFailure {
            kind: TaskKind::ContainerBuild,
            cause: BackendError::BuildFailure { .. },
            ..
        }) => {}
        other => panic!("expected BuildFailure, got {other:?}"),
    }
    assert!(fx.client.created_specs().is_empty());
}

#[tokio::test]
async fn missing_store_directory_is_created() {
    init_tracing();
    let fx = fixture(FakeContainerClient::new());
    let store = fx.store.path().join("new-case");
    let context = RunContext::new(&store, fx.plugins.path());
    let task = TaskBuilder::container("plaso", "forensicstore-plaso").build();
    let inv = Invocation::new(Arc::new(task), Arc::new(context));

    with_timeout(fx.dispatcher.execute(&inv)).await.unwrap();
    assert!(store.is_dir());
}
