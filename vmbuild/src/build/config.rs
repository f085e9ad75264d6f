//! Build configuration loading.
//!
//! Handles loading the build configuration from JSON and YAML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Image format produced when none is configured.
pub const DEFAULT_FORMAT: &str = "qcow2";

/// Static build configuration (set once before the pipeline runs, never changes).
///
/// Owned by the pipeline; steps only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// VM identifier. Also the file name of the prepared disk.
    pub vm_name: String,
    /// Directory the build artifacts are written to.
    /// Defaults to `output-<vm_name>`.
    #[serde(default)]
    pub output_dir: PathBuf,
    /// Target image format (e.g. `qcow2`, `raw`).
    #[serde(default = "default_format")]
    pub format: String,
    /// Whether a primary disk must be materialized at all.
    #[serde(default = "default_true")]
    pub disk_image: bool,
    /// Whether the VM references the source image instead of owning a copy.
    #[serde(default)]
    pub use_backing_file: bool,
    /// Reuse a non-empty output directory.
    #[serde(default)]
    pub force: bool,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_true() -> bool {
    true
}

impl BuildConfig {
    pub fn new(vm_name: impl Into<String>) -> Self {
        let vm_name = vm_name.into();
        Self {
            output_dir: default_output_dir(&vm_name),
            vm_name,
            format: default_format(),
            disk_image: true,
            use_backing_file: false,
            force: false,
        }
    }

    /// Load a configuration file, picking the parser by extension.
    ///
    /// `.json` and `.yaml`/`.yml` are supported. The result has defaults
    /// filled in and has been validated.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mut config: BuildConfig = match ext.as_deref() {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(BuildError::Config(format!(
                    "Unsupported config file extension: {}",
                    path.display()
                )));
            }
        };

        config.fill_defaults();
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            vm_name = %config.vm_name,
            format = %config.format,
            "Loaded build config"
        );

        Ok(config)
    }

    /// Fill in values that depend on other fields.
    pub fn fill_defaults(&mut self) {
        if self.output_dir.as_os_str().is_empty() {
            self.output_dir = default_output_dir(&self.vm_name);
        }
    }

    pub fn validate(&self) -> BuildResult<()> {
        if self.vm_name.is_empty() {
            return Err(BuildError::Config("vm_name must not be empty".into()));
        }
        if self.vm_name.contains('/') || self.vm_name.contains('\\') {
            return Err(BuildError::Config(format!(
                "vm_name must be a plain file name, got '{}'",
                self.vm_name
            )));
        }
        if self.format.trim().is_empty() {
            return Err(BuildError::Config("format must not be empty".into()));
        }
        Ok(())
    }
}

fn default_output_dir(vm_name: &str) -> PathBuf {
    PathBuf::from(format!("output-{}", vm_name))
}
