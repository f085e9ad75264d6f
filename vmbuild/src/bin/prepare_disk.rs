//! vmbuild-disk: prepare the primary disk of a VM image build.
//!
//! Runs the output-directory and disk steps against a source image, using a
//! build config file with optional command-line overrides.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use vmbuild::build::{BuildConfig, BuildState};
use vmbuild::driver::{QEMU_IMG, QemuDriver};
use vmbuild::pipeline::{PipelineExecutor, StepAction};
use vmbuild::steps::disk_pipeline;
use vmbuild::ui::ConsoleUi;

#[derive(Parser, Debug)]
#[command(name = "vmbuild-disk", version, about = "Prepare the disk backing a VM image build")]
struct Cli {
    /// Source disk image
    #[arg(long)]
    source: PathBuf,

    /// Build config file (.json, .yaml or .yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// VM name; also the prepared disk's file name
    #[arg(long)]
    vm_name: Option<String>,

    /// Directory to write the prepared disk into
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Target image format
    #[arg(long)]
    format: Option<String>,

    /// The VM references the source through a backing file
    #[arg(long)]
    use_backing_file: bool,

    /// Do not materialize a primary disk
    #[arg(long)]
    no_disk_image: bool,

    /// Overwrite a non-empty output directory
    #[arg(long)]
    force: bool,

    /// Path to the qemu-img binary
    #[arg(long, default_value = QEMU_IMG)]
    qemu_img: PathBuf,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn build_config(&self) -> anyhow::Result<BuildConfig> {
        let mut config = match (&self.config, &self.vm_name) {
            (Some(path), _) => BuildConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            (None, Some(name)) => BuildConfig::new(name.clone()),
            (None, None) => anyhow::bail!("either --config or --vm-name is required"),
        };

        if let Some(name) = &self.vm_name {
            config.vm_name = name.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        config.use_backing_file |= self.use_backing_file;
        config.disk_image &= !self.no_disk_image;
        config.force |= self.force;

        config.fill_defaults();
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    match rt.block_on(run()) {
        Ok(StepAction::Continue) => {}
        Ok(StepAction::Halt) => process::exit(1),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(2);
        }
    }
}

async fn run() -> anyhow::Result<StepAction> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    vmbuild::init_logging(cli.log_dir.as_deref(), level)?;

    let config = cli.build_config()?;
    let driver = QemuDriver::new(&cli.qemu_img);
    if !driver.is_available() {
        tracing::warn!(
            binary = %driver.binary().display(),
            "qemu-img not found; conversions will fail"
        );
    }

    let ui = Arc::new(ConsoleUi::new(config.vm_name.clone()));
    let ctx = BuildState::new(config, Arc::new(driver), cli.source.clone(), ui).into_ctx();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            signal_token.cancel();
        }
    });

    let report = PipelineExecutor::execute(disk_pipeline(), ctx.clone(), &cancel).await;
    report.metrics.log_summary();

    let state = ctx.lock().await;
    match report.action {
        StepAction::Continue => {
            match &state.disk_filename {
                Some(name) => tracing::info!(disk = %name, "Disk converted"),
                None => tracing::info!("Disk step finished"),
            }
        }
        StepAction::Halt => {
            if let Some(err) = &state.error {
                tracing::error!(cancelled = report.cancelled, "Build halted: {}", err);
            }
        }
    }

    Ok(report.action)
}
