//! vmbuild disk preparation library.
//!
//! This crate provides the disk-preparation step of a VM image build and the
//! small step pipeline that drives it.

use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Global guard for tracing-appender to keep the writer thread alive
static LOG_GUARD: OnceLock<Option<tracing_appender::non_blocking::WorkerGuard>> = OnceLock::new();

pub mod build;
pub mod disk;
pub mod driver;
pub mod pipeline;
pub mod steps;
pub mod ui;

pub use build::{BuildConfig, BuildCtx, BuildState};
pub use disk::{DiskAction, prepare_disk};
pub use driver::{Driver, QemuDriver, RecordingDriver};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineReport, StepAction};
pub use ui::{ConsoleUi, RecordingUi, Ui};
pub use vmbuild_shared::errors::{BuildError, BuildResult};

/// vmbuild library version (from CARGO_PKG_VERSION at compile time).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing.
///
/// Logs go to stderr. With `logs_dir`, they are also written to
/// `<logs_dir>/vmbuild.log` with daily rotation. Uses the `RUST_LOG`
/// environment variable for filtering (defaults to `default_level`).
/// Idempotent: subsequent calls return immediately once initialized.
pub fn init_logging(logs_dir: Option<&Path>, default_level: &str) -> BuildResult<()> {
    if let Some(dir) = logs_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            BuildError::Storage(format!(
                "Failed to create logs directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    let _ = LOG_GUARD.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stderr_layer = fmt::layer().with_writer(std::io::stderr);

        match logs_dir {
            Some(dir) => {
                let file_appender = tracing_appender::rolling::daily(dir, "vmbuild.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

                // If a global default subscriber is already set, this returns an error.
                // We ignore it to avoid interfering with host-configured tracing.
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stderr_layer)
                    .with(file_layer)
                    .try_init();

                Some(guard)
            }
            None => {
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stderr_layer)
                    .try_init();
                None
            }
        }
    });

    Ok(())
}
