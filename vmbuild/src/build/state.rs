//! Shared build context passed between pipeline steps.

use super::BuildConfig;
use crate::driver::Driver;
use crate::pipeline::StepContext;
use crate::ui::Ui;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use vmbuild_shared::errors::BuildError;

/// Shared pipeline context type.
pub type BuildCtx = Arc<Mutex<BuildState>>;

/// Shared build state.
///
/// Stores shared inputs and the outputs each step publishes for the steps
/// after it.
pub struct BuildState {
    pub config: BuildConfig,
    pub driver: Arc<dyn Driver>,
    /// Source image the primary disk is prepared from.
    pub iso_path: PathBuf,
    pub ui: Arc<dyn Ui>,
    /// Name of the prepared disk (set by the disk step on conversion).
    pub disk_filename: Option<String>,
    /// First fatal error of the build.
    pub error: Option<BuildError>,
    /// Set by the executor when the run stopped early.
    pub halted: bool,
    /// Set by the executor when the stop was a cancellation.
    pub cancelled: bool,
}

impl BuildState {
    pub fn new(
        config: BuildConfig,
        driver: Arc<dyn Driver>,
        iso_path: PathBuf,
        ui: Arc<dyn Ui>,
    ) -> Self {
        Self {
            config,
            driver,
            iso_path,
            ui,
            disk_filename: None,
            error: None,
            halted: false,
            cancelled: false,
        }
    }

    pub fn into_ctx(self) -> BuildCtx {
        Arc::new(Mutex::new(self))
    }

    /// Record a fatal error. Only the first one is kept.
    pub fn record_error(&mut self, err: BuildError) {
        if self.error.is_none() {
            self.error = Some(err);
        } else {
            tracing::debug!("Ignoring follow-up error: {}", err);
        }
    }
}

#[async_trait]
impl StepContext for BuildCtx {
    async fn mark_halted(&self, cancelled: bool) {
        let mut state = self.lock().await;
        state.halted = true;
        state.cancelled = cancelled;
        if cancelled {
            state.record_error(BuildError::Cancelled(
                "build interrupted before all steps ran".into(),
            ));
        }
    }
}
