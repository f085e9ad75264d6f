//! Step: Disk preparation.
//!
//! Produces the disk that backs the VM under construction at
//! `<output_dir>/<vm_name>`, either by copying a source that is already in
//! the target format or by converting it.

use super::{fail_step, step_start};
use crate::build::BuildCtx;
use crate::disk::{DiskAction, DiskPrepInput, prepare_disk, resolve_destination};
use crate::pipeline::{BuildStep, StepAction};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vmbuild_shared::errors::BuildError;

pub struct CopyDiskStep;

#[async_trait]
impl BuildStep<BuildCtx> for CopyDiskStep {
    async fn run(&self, ctx: BuildCtx, _cancel: CancellationToken) -> StepAction {
        let step_name = self.name();

        let (config, driver, iso_path, ui) = {
            let state = ctx.lock().await;
            (
                state.config.clone(),
                Arc::clone(&state.driver),
                state.iso_path.clone(),
                Arc::clone(&state.ui),
            )
        };
        step_start(&config.vm_name, step_name);

        let dest = resolve_destination(&config);

        // Inspection, copy and conversion all block on disk or a subprocess.
        let result = tokio::task::spawn_blocking(move || {
            prepare_disk(DiskPrepInput {
                source: &iso_path,
                dest: &dest,
                config: &config,
                driver: driver.as_ref(),
                ui: ui.as_ref(),
            })
        })
        .await
        .unwrap_or_else(|e| {
            Err(BuildError::Internal(format!(
                "disk preparation task failed: {}",
                e
            )))
        });

        match result {
            Ok(output) => {
                if output.action == DiskAction::Skip {
                    tracing::debug!(step = %step_name, "No primary disk needed");
                }
                if let Some(name) = output.disk_filename {
                    ctx.lock().await.disk_filename = Some(name);
                }
                StepAction::Continue
            }
            Err(e) => fail_step(&ctx, step_name, e).await,
        }
    }

    async fn cleanup(&self, _ctx: BuildCtx) {
        // The prepared disk belongs to the build, not to this step.
    }

    fn name(&self) -> &str {
        "copy_disk"
    }
}
