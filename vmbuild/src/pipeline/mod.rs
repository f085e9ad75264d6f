//! Generic step pipeline execution framework.
//!
//! This module provides the step-sequencing engine used by image builds:
//! - Ordered, one-at-a-time step execution
//! - `Continue`/`Halt` outcomes reported by each step
//! - Cooperative cancellation checked at step boundaries
//! - Reverse-order cleanup of every step that ran
//!
//! ## Architecture
//!
//! ```text
//! Pipeline → Steps
//!
//! - Pipeline: Ordered list of steps sharing one context
//! - Step: Atomic unit of work, reports Continue or Halt
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{Pipeline, PipelineExecutor};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipeline = Pipeline::new(vec![Box::new(StepA), Box::new(StepB)]);
//! let report = PipelineExecutor::execute(pipeline, ctx, &CancellationToken::new()).await;
//! println!("pipeline took {}ms", report.metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod step;

pub use metrics::{PipelineMetrics, StepMetrics};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineReport};
pub use step::{BoxedStep, BuildStep, StepAction, StepContext};
