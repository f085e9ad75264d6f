//! Build steps.
//!
//! ```text
//! PrepareOutputDir ──→ CopyDisk
//! ```
//!
//! Each step reads its inputs from [`BuildCtx`], publishes outputs back into
//! it, and reports `Continue` or `Halt`.

mod copy_disk;
mod output_dir;

pub use copy_disk::CopyDiskStep;
pub use output_dir::PrepareOutputDirStep;

use crate::build::BuildCtx;
use crate::pipeline::{BoxedStep, Pipeline, StepAction};
use vmbuild_shared::errors::BuildError;

/// Default step sequence for preparing a VM disk.
pub fn disk_pipeline() -> Pipeline<BuildCtx> {
    let steps: Vec<BoxedStep<BuildCtx>> = vec![
        Box::new(PrepareOutputDirStep::new()),
        Box::new(CopyDiskStep),
    ];
    Pipeline::new(steps)
}

fn step_start(vm_name: &str, step_name: &str) {
    tracing::debug!(vm_name = %vm_name, step = %step_name, "Step started");
}

/// Record a fatal step error: log it, report it once to the UI, store it in
/// the build state, and halt.
async fn fail_step(ctx: &BuildCtx, step_name: &str, err: BuildError) -> StepAction {
    tracing::error!(step = %step_name, error = %err, "Step failed");

    let mut state = ctx.lock().await;
    state.ui.error(&err.to_string());
    state.record_error(err);
    StepAction::Halt
}
