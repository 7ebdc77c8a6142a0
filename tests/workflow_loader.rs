// tests/workflow_loader.rs

use std::io::Write;

use forensicflow::config::{DocumentFormat, load_and_validate, parse_str};
use forensicflow::errors::ForensicflowError;
use forensicflow::types::TaskKind;
use forensicflow::workflow::Workflow;

const TOML_WORKFLOW: &str = r#"
[arguments]
docker-server = "registry.example"

[tasks.cwd]
type = "bash"
command = "forensicstore-cwd"

[tasks.plaso]
type = "docker"
command = "forensicstore-plaso"
requires = ["cwd"]
pull = true

[tasks.plaso.with]
file = "/evidence/disk.E01"
parsers = ["winreg", "prefetch"]
depth = 3

[[tasks.plaso.filter]]
type = "file"
path = "Windows"

[[tasks.plaso.filter]]
type = "file"
path = "Users"

[tasks.jq]
type = "dockerfile"
dockerfile = "jq"
command = "echo Dockerfile"
requires = ["plaso"]

[tasks.report]
type = "plugin"
command = "report"
requires = ["plaso", "jq"]
"#;

const YAML_WORKFLOW: &str = r#"
arguments:
  docker-user: alice
tasks:
  cwd:
    type: bash
    command: pwd
  docker:
    type: docker
    image: alpine
    command: echo forensicreports
  hello:
    type: plugin
    command: hello
    requires: [cwd]
    with:
      verbose: true
"#;

#[test]
fn toml_document_parses_into_workflow() {
    let raw = parse_str(TOML_WORKFLOW, DocumentFormat::Toml).unwrap();
    let workflow = Workflow::try_from(raw).unwrap();

    assert_eq!(workflow.len(), 4);
    assert_eq!(workflow.arguments().get("docker-server"), Some("registry.example"));

    let plaso = workflow.task("plaso").unwrap();
    assert_eq!(plaso.kind, TaskKind::Container);
    assert!(plaso.pull);
    assert_eq!(plaso.requires, vec!["cwd".to_string()]);
    assert_eq!(plaso.arguments.get_all("parsers"), ["winreg".to_string(), "prefetch".to_string()]);
    assert_eq!(plaso.arguments.get("depth"), Some("3"));
    assert_eq!(plaso.filter.groups().len(), 2);

    let jq = workflow.task("jq").unwrap();
    assert_eq!(jq.kind, TaskKind::ContainerBuild);
    assert_eq!(jq.dockerfile.as_deref(), Some("jq"));

    assert_eq!(workflow.task("cwd").unwrap().kind, TaskKind::Shell);
    assert_eq!(workflow.task("report").unwrap().kind, TaskKind::Plugin);

    let order = workflow.graph().unwrap().topological_order();
    assert_eq!(order, vec!["cwd", "plaso", "jq", "report"]);
}

#[test]
fn yaml_document_parses_into_workflow() {
    let raw = parse_str(YAML_WORKFLOW, DocumentFormat::Yaml).unwrap();
    let workflow = Workflow::try_from(raw).unwrap();

    assert_eq!(workflow.arguments().get("docker-user"), Some("alice"));
    let docker = workflow.task("docker").unwrap();
    assert_eq!(docker.kind, TaskKind::Container);
    assert_eq!(docker.image.as_deref(), Some("alpine"));
    assert_eq!(docker.command, "echo forensicreports");

    let hello = workflow.task("hello").unwrap();
    assert_eq!(hello.arguments.get("verbose"), Some("true"));
}

#[test]
fn format_follows_file_extension() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    write!(file, "{YAML_WORKFLOW}").unwrap();

    let workflow = load_and_validate(file.path()).unwrap();
    assert_eq!(workflow.len(), 3);
    assert!(workflow.graph().is_some());
}

#[test]
fn unknown_task_type_is_a_parse_error() {
    let err = parse_str(
        "[tasks.x]\ntype = \"powershell\"\ncommand = \"x\"\n",
        DocumentFormat::Toml,
    )
    .unwrap_err();
    assert!(matches!(err, ForensicflowError::TomlError(_)));
}

#[test]
fn image_on_shell_task_is_rejected() {
    let raw = parse_str(
        "[tasks.x]\ntype = \"shell\"\ncommand = \"x\"\nimage = \"alpine\"\n",
        DocumentFormat::Toml,
    )
    .unwrap();
    let err = Workflow::try_from(raw).unwrap_err();
    assert!(matches!(err, ForensicflowError::ConfigError(ref m) if m.contains("image")));
}

#[test]
fn empty_command_is_rejected() {
    let raw = parse_str("[tasks.x]\ntype = \"plugin\"\n", DocumentFormat::Toml).unwrap();
    let err = Workflow::try_from(raw).unwrap_err();
    assert!(matches!(err, ForensicflowError::ConfigError(ref m) if m.contains("empty `command`")));
}

#[test]
fn pull_on_containerbuild_task_is_rejected() {
    let raw = parse_str(
        "[tasks.jq]\ntype = \"containerbuild\"\ndockerfile = \"jq\"\ncommand = \"jq\"\npull = true\n",
        DocumentFormat::Toml,
    )
    .unwrap();
    let err = Workflow::try_from(raw).unwrap_err();
    assert!(matches!(err, ForensicflowError::ConfigError(ref m) if m.contains("`pull`")));
}
