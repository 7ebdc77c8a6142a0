// src/registry.rs

//! Name lookup tables handed to a run.
//!
//! Discovery happens once, before the first task runs; executors only read
//! the resulting snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{BackendError, Result};
use crate::exec::{ContainerClient, DockerCli, PluginRegistry};

/// File name prefix of discoverable scripts and images.
pub const COMMAND_PREFIX: &str = "forensicstore-";

/// Script name to executable path.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, PathBuf>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every regular `forensicstore-*` file in `dir`, under both
    /// its file name and its stem (`forensicstore-report.py` answers to
    /// `forensicstore-report` too). A `<script>.info` JSON sidecar with a
    /// `use` field adds that name as well. A missing directory yields an
    /// empty registry.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "script directory does not exist");
                return Ok(registry);
            }
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.starts_with(COMMAND_PREFIX) || file_name.ends_with(".info") {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && stem != file_name
            {
                registry.scripts.entry(stem.to_string()).or_insert_with(|| path.clone());
            }
            if let Some(name) = read_info(&path).and_then(ScriptInfo::command_name) {
                registry.insert(name, path.clone());
            }
            registry.insert(file_name.to_string(), path.clone());
        }

        debug!(dir = %dir.display(), scripts = registry.len(), "scripts discovered");
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.scripts.insert(name.into(), path.into());
    }

    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(name, path);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.scripts.get(name).map(PathBuf::as_path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Script metadata kept next to the script as `<script>.info`.
#[derive(Debug, Default, Deserialize)]
struct ScriptInfo {
    #[serde(default, rename = "use", alias = "Use")]
    usage: String,
}

impl ScriptInfo {
    /// First word of the usage line.
    fn command_name(self) -> Option<String> {
        self.usage.split_whitespace().next().map(str::to_string)
    }
}

fn read_info(script: &Path) -> Option<ScriptInfo> {
    let mut info_path = script.as_os_str().to_owned();
    info_path.push(".info");
    let info_path = PathBuf::from(info_path);

    let contents = match std::fs::read_to_string(&info_path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %info_path.display(), error = %e, "no script info");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(path = %info_path.display(), error = %e, "ignoring malformed script info");
            None
        }
    }
}

/// Short image name (`forensicstore-plaso`) to full reference
/// (`registry.example/forensicstore-plaso:v1`).
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    images: BTreeMap<String, String>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the `forensicstore-*` entries of `references`
    /// (`repository:tag` strings). The first reference seen for a name wins.
    pub fn from_references<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for reference in references {
            let reference = reference.as_ref();
            let name = short_image_name(reference);
            if name.starts_with(COMMAND_PREFIX) {
                registry
                    .images
                    .entry(name.to_string())
                    .or_insert_with(|| reference.to_string());
            }
        }
        registry
    }

    /// List local images through `client`.
    pub async fn discover(client: &dyn ContainerClient) -> std::result::Result<Self, BackendError> {
        let references = client.list_images().await?;
        let registry = Self::from_references(references);
        debug!(images = registry.len(), "container images discovered");
        Ok(registry)
    }

    pub fn insert(&mut self, name: impl Into<String>, reference: impl Into<String>) {
        self.images.insert(name.into(), reference.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.images.get(name).map(String::as_str)
    }

    /// Registered reference for `name`, or `name` itself.
    pub fn resolve(&self, name: &str) -> String {
        self.get(name).unwrap_or(name).to_string()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Last path segment of an image reference without its tag.
fn short_image_name(reference: &str) -> &str {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    last.split(':').next().unwrap_or(last)
}

/// Immutable snapshot of everything executors look up by name.
#[derive(Clone)]
pub struct Registries {
    pub scripts: ScriptRegistry,
    pub plugins: PluginRegistry,
    pub images: ImageRegistry,
    pub containers: Arc<dyn ContainerClient>,
}

impl Registries {
    /// Empty lookup tables around `containers`.
    pub fn new(containers: Arc<dyn ContainerClient>) -> Self {
        Self {
            scripts: ScriptRegistry::new(),
            plugins: PluginRegistry::new(),
            images: ImageRegistry::new(),
            containers,
        }
    }

    pub fn with_scripts(mut self, scripts: ScriptRegistry) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_images(mut self, images: ImageRegistry) -> Self {
        self.images = images;
        self
    }

    /// Scan `script_dir` and the local docker images. An unreachable
    /// docker daemon leaves the image table empty.
    pub async fn discover(script_dir: &Path, plugins: PluginRegistry) -> Result<Self> {
        let docker: Arc<dyn ContainerClient> = Arc::new(DockerCli::default());
        let scripts = ScriptRegistry::discover(script_dir)?;
        let images = match ImageRegistry::discover(docker.as_ref()).await {
            Ok(images) => images,
            Err(e) => {
                warn!(
                    error = %e,
                    "listing container images failed; continuing without image discovery"
                );
                ImageRegistry::new()
            }
        };

        Ok(Self::new(docker)
            .with_scripts(scripts)
            .with_plugins(plugins)
            .with_images(images))
    }
}

/// `<user config dir>/forensicstore/scripts`, when a config dir is known.
pub fn default_script_dir() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join("forensicstore").join("scripts"))
}

fn user_config_dir() -> Option<PathBuf> {
    let non_empty = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
    if cfg!(windows) {
        non_empty("APPDATA")
    } else if cfg!(target_os = "macos") {
        non_empty("HOME").map(|home| home.join("Library").join("Application Support"))
    } else {
        non_empty("XDG_CONFIG_HOME").or_else(|| non_empty("HOME").map(|home| home.join(".config")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_drop_registry_and_tag() {
        assert_eq!(
            short_image_name("docker.io/forensicanalysis/forensicstore-plaso:v1"),
            "forensicstore-plaso"
        );
        assert_eq!(short_image_name("forensicstore-yara"), "forensicstore-yara");
    }

    #[test]
    fn only_prefixed_images_are_registered() {
        let images = ImageRegistry::from_references([
            "ubuntu:22.04",
            "registry.example/forensicstore-plaso:latest",
            "registry.example/forensicstore-plaso:old",
        ]);
        assert_eq!(images.len(), 1);
        assert_eq!(
            images.get("forensicstore-plaso"),
            Some("registry.example/forensicstore-plaso:latest")
        );
        assert_eq!(images.resolve("ubuntu"), "ubuntu");
    }

    #[test]
    fn script_discovery_registers_names_and_stems() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("forensicstore-report.py"), "").unwrap();
        std::fs::write(dir.path().join("forensicstore-report.py.info"), "{}").unwrap();
        std::fs::write(dir.path().join("unrelated.sh"), "").unwrap();
        std::fs::create_dir(dir.path().join("forensicstore-dir")).unwrap();

        let scripts = ScriptRegistry::discover(dir.path()).unwrap();
        assert!(scripts.get("forensicstore-report.py").is_some());
        assert!(scripts.get("forensicstore-report").is_some());
        assert!(scripts.get("unrelated.sh").is_none());
        assert!(scripts.get("forensicstore-dir").is_none());
        assert_eq!(scripts.len(), 2);
    }

    #[test]
    fn script_info_adds_its_use_name() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("forensicstore-export.sh");
        std::fs::write(&script, "").unwrap();
        std::fs::write(
            dir.path().join("forensicstore-export.sh.info"),
            r#"{"use": "export-csv <store>", "short": "export items"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("forensicstore-broken"), "").unwrap();
        std::fs::write(dir.path().join("forensicstore-broken.info"), "not json").unwrap();

        let scripts = ScriptRegistry::discover(dir.path()).unwrap();
        assert_eq!(scripts.get("export-csv"), Some(script.as_path()));
        assert_eq!(scripts.get("forensicstore-export"), Some(script.as_path()));
        assert!(scripts.get("forensicstore-broken").is_some());
        assert_eq!(scripts.len(), 4);
    }

    #[test]
    fn missing_script_dir_is_empty() {
        let scripts = ScriptRegistry::discover(Path::new("/definitely/not/here")).unwrap();
        assert!(scripts.is_empty());
    }
}
