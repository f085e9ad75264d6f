//! Generic pipeline execution framework.
//!
//! Provides a sequential step executor with cooperative cancellation at step
//! boundaries and reverse-order cleanup.

use super::metrics::{PipelineMetrics, StepMetrics};
use super::step::{BoxedStep, StepAction, StepContext};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct Pipeline<Ctx> {
    steps: Vec<BoxedStep<Ctx>>,
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new(steps: Vec<BoxedStep<Ctx>>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// `Halt` if any step halted or the run was cancelled.
    pub action: StepAction,
    /// True when the run stopped because the cancellation token fired.
    pub cancelled: bool,
    pub metrics: PipelineMetrics,
}

/// Pipeline executor framework.
///
/// Runs steps one at a time, in order. The context is never touched by two
/// steps at once.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a pipeline.
    ///
    /// Stops at the first step that reports [`StepAction::Halt`], or before
    /// the next step once `cancel` fires. A step that is already running is
    /// allowed to finish. Every step that ran is then cleaned up in reverse
    /// order.
    pub async fn execute<Ctx>(
        pipeline: Pipeline<Ctx>,
        ctx: Ctx,
        cancel: &CancellationToken,
    ) -> PipelineReport
    where
        Ctx: StepContext,
    {
        let total_start = Instant::now();
        let mut step_metrics = Vec::with_capacity(pipeline.steps.len());
        let mut action = StepAction::Continue;
        let mut cancelled = false;

        for (index, step) in pipeline.steps.iter().enumerate() {
            let name = step.name().to_string();

            if cancel.is_cancelled() {
                tracing::warn!(step = %name, "Build cancelled, skipping remaining steps");
                action = StepAction::Halt;
                cancelled = true;
                break;
            }

            tracing::debug!(index, step = %name, "Running step");
            let step_start = Instant::now();
            let step_action = step.run(ctx.clone(), cancel.clone()).await;

            step_metrics.push(StepMetrics {
                index,
                name,
                action: step_action,
                duration_ms: step_start.elapsed().as_millis(),
            });

            if step_action.is_halt() {
                action = StepAction::Halt;
                break;
            }
        }

        if action.is_halt() {
            ctx.mark_halted(cancelled).await;
        }

        let ran = step_metrics.len();
        for step in pipeline.steps[..ran].iter().rev() {
            tracing::debug!(step = %step.name(), "Cleaning up step");
            step.cleanup(ctx.clone()).await;
        }

        PipelineReport {
            action,
            cancelled,
            metrics: PipelineMetrics {
                total_duration_ms: total_start.elapsed().as_millis(),
                steps: step_metrics,
            },
        }
    }
}
