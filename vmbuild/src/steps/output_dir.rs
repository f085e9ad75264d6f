//! Step: Output directory setup.
//!
//! Creates the directory build artifacts are written to. Refuses to reuse a
//! non-empty directory unless `force` is set. On a halted or cancelled
//! build, removes the directory again if this step created it.

use super::{fail_step, step_start};
use crate::build::BuildCtx;
use crate::pipeline::{BuildStep, StepAction};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use vmbuild_shared::errors::{BuildError, BuildResult};

#[derive(Default)]
pub struct PrepareOutputDirStep {
    /// Whether this run created (or recreated) the directory.
    owned: AtomicBool,
}

impl PrepareOutputDirStep {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BuildStep<BuildCtx> for PrepareOutputDirStep {
    async fn run(&self, ctx: BuildCtx, _cancel: CancellationToken) -> StepAction {
        let step_name = self.name();
        let (output_dir, force, vm_name) = {
            let state = ctx.lock().await;
            (
                state.config.output_dir.clone(),
                state.config.force,
                state.config.vm_name.clone(),
            )
        };
        step_start(&vm_name, step_name);

        match prepare_output_dir(&output_dir, force) {
            Ok(created) => {
                self.owned.store(created, Ordering::SeqCst);
                StepAction::Continue
            }
            Err(e) => fail_step(&ctx, step_name, e).await,
        }
    }

    async fn cleanup(&self, ctx: BuildCtx) {
        let (halted, output_dir) = {
            let state = ctx.lock().await;
            (state.halted, state.config.output_dir.clone())
        };

        if !halted || !self.owned.load(Ordering::SeqCst) {
            return;
        }

        tracing::info!(output_dir = %output_dir.display(), "Removing output directory");
        if let Err(e) = std::fs::remove_dir_all(&output_dir) {
            tracing::warn!(
                output_dir = %output_dir.display(),
                "Failed to remove output directory: {}",
                e
            );
        }
    }

    fn name(&self) -> &str {
        "prepare_output_dir"
    }
}

/// Make sure `dir` exists and is safe to write into.
///
/// Returns true when the directory was created (or recreated under `force`)
/// by this call.
fn prepare_output_dir(dir: &Path, force: bool) -> BuildResult<bool> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(BuildError::Storage(format!(
                "Output path exists and is not a directory: {}",
                dir.display()
            )));
        }

        let empty = std::fs::read_dir(dir)
            .map_err(|e| {
                BuildError::Storage(format!(
                    "Failed to read output directory {}: {}",
                    dir.display(),
                    e
                ))
            })?
            .next()
            .is_none();

        if empty {
            return Ok(false);
        }

        if !force {
            return Err(BuildError::Storage(format!(
                "Output directory exists and is not empty: {} (use force to overwrite)",
                dir.display()
            )));
        }

        tracing::info!(output_dir = %dir.display(), "Deleting previous output directory");
        std::fs::remove_dir_all(dir).map_err(|e| {
            BuildError::Storage(format!(
                "Failed to remove output directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    std::fs::create_dir_all(dir).map_err(|e| {
        BuildError::Storage(format!(
            "Failed to create output directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    Ok(true)
}
