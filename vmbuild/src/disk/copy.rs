//! Straight byte-for-byte file copy.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use vmbuild_shared::errors::{BuildError, BuildResult};

/// Copy `src` to `dst`, creating or truncating `dst`.
///
/// Both files are closed on every exit path. The destination is flushed and
/// synced before returning, so a failed close is reported as a copy failure
/// rather than lost. If anything fails after `dst` was created, the partial
/// file is removed.
///
/// Returns the number of bytes copied.
pub fn copy_file(src: &Path, dst: &Path) -> BuildResult<u64> {
    let mut input = File::open(src).map_err(|e| {
        BuildError::Copy(format!("Failed to open source {}: {}", src.display(), e))
    })?;

    if is_same_file(src, dst) {
        return Err(BuildError::Copy(format!(
            "Source and destination are the same file: {}",
            src.display()
        )));
    }

    let output = File::create(dst).map_err(|e| {
        BuildError::Copy(format!(
            "Failed to create destination {}: {}",
            dst.display(),
            e
        ))
    })?;

    match stream(&mut input, output) {
        Ok(bytes) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                bytes,
                "Copied disk image"
            );
            Ok(bytes)
        }
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(dst) {
                tracing::warn!(
                    dst = %dst.display(),
                    "Failed to remove partial copy: {}",
                    rm
                );
            }
            Err(BuildError::Copy(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                dst.display(),
                e
            )))
        }
    }
}

fn stream(input: &mut File, output: File) -> io::Result<u64> {
    let mut writer = BufWriter::new(output);
    let bytes = io::copy(input, &mut writer)?;
    writer.flush()?;
    let output = writer.into_inner().map_err(|e| e.into_error())?;
    output.sync_all()?;
    Ok(bytes)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
