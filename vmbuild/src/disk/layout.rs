use crate::build::BuildConfig;
use std::path::PathBuf;

/// Path the prepared disk is written to: `<output_dir>/<vm_name>`.
pub fn resolve_destination(config: &BuildConfig) -> PathBuf {
    config.output_dir.join(&config.vm_name)
}
