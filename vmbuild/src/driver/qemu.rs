//! Wrapper around the `qemu-img` command-line tool.

use super::Driver;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Default binary name, resolved through `PATH`.
pub const QEMU_IMG: &str = "qemu-img";

/// Information returned by `qemu-img info --output=json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QemuImgInfo {
    pub format: String,
    pub virtual_size: Option<u64>,
    pub actual_size: Option<u64>,
    pub backing_filename: Option<String>,
}

impl QemuImgInfo {
    pub fn parse(json: &[u8]) -> BuildResult<Self> {
        serde_json::from_slice(json).map_err(|e| {
            BuildError::Inspection(format!("Failed to parse qemu-img info output: {}", e))
        })
    }
}

/// Driver backed by a real `qemu-img` binary.
#[derive(Debug, Clone)]
pub struct QemuDriver {
    binary: PathBuf,
}

impl Default for QemuDriver {
    fn default() -> Self {
        Self::new(QEMU_IMG)
    }
}

impl QemuDriver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check if the configured binary runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Run `qemu-img info --output=json` on a disk image.
    pub fn info(&self, path: &Path) -> BuildResult<QemuImgInfo> {
        let output = Command::new(&self.binary)
            .args(["info", "--output=json"])
            .arg(path)
            .output()
            .map_err(|e| {
                BuildError::Inspection(format!(
                    "Failed to run {} info on {}: {}",
                    self.binary.display(),
                    path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(BuildError::Inspection(format!(
                "qemu-img info failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        QemuImgInfo::parse(&output.stdout)
    }
}

impl Driver for QemuDriver {
    fn image_format(&self, path: &Path) -> BuildResult<String> {
        Ok(self.info(path)?.format)
    }

    fn qemu_img(&self, args: &[OsString]) -> BuildResult<()> {
        tracing::debug!(binary = %self.binary.display(), ?args, "Running qemu-img");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| {
                BuildError::Storage(format!(
                    "Failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(BuildError::Storage(format!(
                "qemu-img {} failed ({}): {}",
                args.first()
                    .map(|a| a.to_string_lossy())
                    .unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}
