//! Generic step trait for pipeline execution.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Outcome a step reports back to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Proceed to the next step.
    Continue,
    /// Abort the remaining steps and roll back.
    Halt,
}

impl StepAction {
    pub fn is_halt(self) -> bool {
        self == StepAction::Halt
    }
}

/// Trait for steps that can be executed in a pipeline.
///
/// Steps run with a shared context, which is cloned per step. Failures are
/// not returned as errors: a step records what went wrong in the context and
/// reports [`StepAction::Halt`].
#[async_trait]
pub trait BuildStep<Ctx>: Send + Sync {
    /// Execute the step with the shared pipeline context.
    ///
    /// `cancel` is checked by the executor between steps. Steps may poll it,
    /// but are not required to.
    async fn run(&self, ctx: Ctx, cancel: CancellationToken) -> StepAction;

    /// Release anything this step owns.
    ///
    /// Called in reverse order for every step that ran, whether the
    /// pipeline completed or halted.
    async fn cleanup(&self, ctx: Ctx);

    /// Get human-readable step name for logging.
    fn name(&self) -> &str;
}

pub type BoxedStep<Ctx> = Box<dyn BuildStep<Ctx>>;

/// Hook the executor uses to tell the shared context that a run stopped early.
///
/// Invoked once, before cleanup, so that steps can tell a rollback from a
/// normal teardown.
#[async_trait]
pub trait StepContext: Clone + Send + Sync {
    async fn mark_halted(&self, cancelled: bool);
}
