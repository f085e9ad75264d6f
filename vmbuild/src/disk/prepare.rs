//! Disk preparation: copy, convert, or skip.
//!
//! The decision is a pure function of the inspected source format and the
//! build config. Execution is kept separate so the decision table can be
//! tested without touching the filesystem.

use super::copy::copy_file;
use super::inspect::inspect_format;
use crate::build::BuildConfig;
use crate::driver::Driver;
use crate::ui::Ui;
use std::ffi::OsString;
use std::path::Path;
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Message shown before the conversion tool runs.
pub const CONVERT_PROGRESS_MESSAGE: &str = "Copying hard drive...";

/// What the disk step does for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskAction {
    /// Source is already in the target format: copy it byte for byte.
    DirectCopy,
    /// Run the conversion tool into the target format.
    Convert,
    /// No primary disk is needed.
    Skip,
}

/// Choose the action for a source whose inspected format is `inspected`
/// (`None` when inspection failed).
///
/// The format check comes first. A matching source is copied even when
/// `disk_image` is off or `use_backing_file` is on; those flags only gate
/// the conversion branch.
pub fn decide_action(inspected: Option<&str>, config: &BuildConfig) -> DiskAction {
    if inspected == Some(config.format.as_str()) {
        return DiskAction::DirectCopy;
    }

    if !config.disk_image || config.use_backing_file {
        return DiskAction::Skip;
    }

    DiskAction::Convert
}

/// Argument list for the conversion tool.
pub fn convert_args(format: &str, source: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "convert".into(),
        "-O".into(),
        format.into(),
        source.into(),
        dest.into(),
    ]
}

/// Driver failures already say what went wrong; only the phase prefix is added.
fn conversion_error(err: BuildError) -> BuildError {
    match err {
        BuildError::Storage(msg) | BuildError::Internal(msg) => BuildError::Conversion(msg),
        conversion @ BuildError::Conversion(_) => conversion,
        other => BuildError::Conversion(other.to_string()),
    }
}

/// Input for disk preparation.
pub struct DiskPrepInput<'a> {
    pub source: &'a Path,
    pub dest: &'a Path,
    pub config: &'a BuildConfig,
    pub driver: &'a dyn Driver,
    pub ui: &'a dyn Ui,
}

/// Output from disk preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskPrepOutput {
    pub action: DiskAction,
    /// Logical name of the prepared disk. Only set when a conversion ran.
    pub disk_filename: Option<String>,
}

/// Inspect the source, decide, and carry out the chosen action.
///
/// Inspection failure only steers the decision. Copy and conversion
/// failures are returned as [`BuildError::Copy`] and
/// [`BuildError::Conversion`]; the caller halts the build on either.
pub fn prepare_disk(input: DiskPrepInput<'_>) -> BuildResult<DiskPrepOutput> {
    let inspected = inspect_format(input.driver, input.source).ok();
    let action = decide_action(inspected.as_deref(), input.config);

    tracing::info!(
        source = %input.source.display(),
        dest = %input.dest.display(),
        source_format = inspected.as_deref().unwrap_or("unknown"),
        target_format = %input.config.format,
        ?action,
        "Preparing disk"
    );

    match action {
        DiskAction::DirectCopy => {
            copy_file(input.source, input.dest)?;
            Ok(DiskPrepOutput {
                action,
                disk_filename: None,
            })
        }
        DiskAction::Skip => Ok(DiskPrepOutput {
            action,
            disk_filename: None,
        }),
        DiskAction::Convert => {
            let args = convert_args(&input.config.format, input.source, input.dest);

            input.ui.say(CONVERT_PROGRESS_MESSAGE);
            input.driver.qemu_img(&args).map_err(conversion_error)?;

            Ok(DiskPrepOutput {
                action,
                disk_filename: Some(input.config.vm_name.clone()),
            })
        }
    }
}
