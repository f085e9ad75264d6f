//! Image tool driver.
//!
//! The disk step never touches image formats itself. Everything format
//! related goes through a [`Driver`]:
//! - `QemuDriver` - shells out to `qemu-img`
//! - `RecordingDriver` - canned answers and recorded calls, for tests

mod qemu;
mod recording;

use std::ffi::OsString;
use std::path::Path;
use vmbuild_shared::errors::BuildResult;

pub use qemu::{QEMU_IMG, QemuDriver, QemuImgInfo};
pub use recording::RecordingDriver;

/// Capability handle for image inspection and conversion.
///
/// Both operations block for the duration of the subprocess.
pub trait Driver: Send + Sync {
    /// Report the on-disk format of the image at `path` (e.g. `qcow2`, `raw`).
    fn image_format(&self, path: &Path) -> BuildResult<String>;

    /// Run the image tool with the given arguments, e.g.
    /// `["convert", "-O", "qcow2", src, dst]`.
    ///
    /// Paths are passed as-is, so they need not be valid UTF-8. Failures
    /// are [`BuildError::Storage`](vmbuild_shared::errors::BuildError::Storage)
    /// carrying the tool's own message, without a phase prefix.
    fn qemu_img(&self, args: &[OsString]) -> BuildResult<()>;
}
