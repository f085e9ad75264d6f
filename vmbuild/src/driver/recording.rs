//! In-process driver with canned answers.

use super::Driver;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Fake driver that records every call.
///
/// Inspection returns a fixed format (or a fixed failure). `qemu_img`
/// succeeds unless configured to fail; with [`write_output`](Self::write_output)
/// a successful `convert` writes a small marker file at the destination.
/// Arguments are recorded lossily as strings.
#[derive(Debug)]
pub struct RecordingDriver {
    format: Result<String, String>,
    conversion_error: Option<String>,
    write_output: bool,
    inspected: Mutex<Vec<PathBuf>>,
    invocations: Mutex<Vec<Vec<String>>>,
}

impl RecordingDriver {
    /// Driver that reports every image as `format`.
    pub fn with_format(format: impl Into<String>) -> Self {
        Self::build(Ok(format.into()))
    }

    /// Driver whose inspection always fails (e.g. a corrupt header).
    pub fn failing_inspection(message: impl Into<String>) -> Self {
        Self::build(Err(message.into()))
    }

    fn build(format: Result<String, String>) -> Self {
        Self {
            format,
            conversion_error: None,
            write_output: false,
            inspected: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Make every `qemu_img` call fail with `message`.
    pub fn fail_conversion(mut self, message: impl Into<String>) -> Self {
        self.conversion_error = Some(message.into());
        self
    }

    pub fn write_output(mut self) -> Self {
        self.write_output = true;
        self
    }

    /// Paths passed to `image_format`, in call order.
    pub fn inspected(&self) -> Vec<PathBuf> {
        self.inspected.lock().clone()
    }

    /// Argument lists passed to `qemu_img`, in call order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().clone()
    }
}

impl Driver for RecordingDriver {
    fn image_format(&self, path: &Path) -> BuildResult<String> {
        self.inspected.lock().push(path.to_path_buf());
        self.format.clone().map_err(BuildError::Inspection)
    }

    fn qemu_img(&self, args: &[OsString]) -> BuildResult<()> {
        self.invocations
            .lock()
            .push(args.iter().map(|a| a.to_string_lossy().into_owned()).collect());

        if let Some(message) = &self.conversion_error {
            return Err(BuildError::Storage(message.clone()));
        }

        if self.write_output
            && let [op, _, target_format, _, dest] = args
            && op == "convert"
        {
            std::fs::write(dest, format!("converted:{}", target_format.to_string_lossy()))
                .map_err(|e| {
                    BuildError::Storage(format!(
                        "Failed to write {}: {}",
                        Path::new(dest).display(),
                        e
                    ))
                })?;
        }

        Ok(())
    }
}
