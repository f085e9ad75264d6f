//! Source image format detection.

use crate::driver::Driver;
use std::path::Path;
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Ask the driver for the on-disk format of `path`.
///
/// Any failure comes back as [`BuildError::Inspection`]. Callers treat that
/// as "format unknown", never as a reason to stop the build.
pub fn inspect_format(driver: &dyn Driver, path: &Path) -> BuildResult<String> {
    match driver.image_format(path) {
        Ok(format) => {
            tracing::debug!(path = %path.display(), format = %format, "Inspected image format");
            Ok(format)
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), "Could not determine image format: {}", e);
            Err(match e {
                BuildError::Inspection(_) => e,
                other => BuildError::Inspection(other.to_string()),
            })
        }
    }
}
