//! End-to-end behavior of the disk step, driven through the pipeline.
//!
//! Uses the recording driver, so no `qemu-img` binary is needed.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vmbuild::build::{BuildConfig, BuildCtx, BuildState};
use vmbuild::disk::CONVERT_PROGRESS_MESSAGE;
use vmbuild::driver::RecordingDriver;
use vmbuild::pipeline::{BuildStep, Pipeline, PipelineExecutor, PipelineReport, StepAction};
use vmbuild::steps::{CopyDiskStep, disk_pipeline};
use vmbuild::ui::RecordingUi;
use vmbuild::BuildError;

// ============================================================================
// TEST FIXTURES
// ============================================================================

const SOURCE_BYTES: &[u8] = b"QFI\xfb\x00\x00\x00\x03source-disk-contents";

/// Isolated build with a source image on disk and automatic cleanup.
struct TestBuild {
    _temp_dir: TempDir,
    source: PathBuf,
    output_dir: PathBuf,
    driver: Arc<RecordingDriver>,
    ui: Arc<RecordingUi>,
    ctx: BuildCtx,
}

impl TestBuild {
    fn new(driver: RecordingDriver, configure: impl FnOnce(&mut BuildConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = temp_dir.path().join("source.img");
        fs::write(&source, SOURCE_BYTES).unwrap();

        let output_dir = temp_dir.path().join("output-vm1");
        let mut config = BuildConfig::new("vm1");
        config.output_dir = output_dir.clone();
        configure(&mut config);

        let driver = Arc::new(driver);
        let ui = Arc::new(RecordingUi::new());
        let ctx = BuildState::new(config, driver.clone(), source.clone(), ui.clone()).into_ctx();

        Self {
            _temp_dir: temp_dir,
            source,
            output_dir,
            driver,
            ui,
            ctx,
        }
    }

    fn dest(&self) -> PathBuf {
        self.output_dir.join("vm1")
    }

    /// Run only the disk step against an existing output directory.
    async fn run_step(&self) -> StepAction {
        fs::create_dir_all(&self.output_dir).unwrap();
        let step = CopyDiskStep;
        let action = step.run(self.ctx.clone(), CancellationToken::new()).await;
        step.cleanup(self.ctx.clone()).await;
        action
    }

    async fn run_pipeline(&self) -> PipelineReport {
        PipelineExecutor::execute(disk_pipeline(), self.ctx.clone(), &CancellationToken::new())
            .await
    }

    async fn disk_filename(&self) -> Option<String> {
        self.ctx.lock().await.disk_filename.clone()
    }

    async fn error(&self) -> Option<BuildError> {
        self.ctx.lock().await.error.clone()
    }
}

fn expected_convert_args(build: &TestBuild, format: &str) -> Vec<String> {
    vec![
        "convert".to_string(),
        "-O".to_string(),
        format.to_string(),
        build.source.to_str().unwrap().to_string(),
        build.dest().to_str().unwrap().to_string(),
    ]
}

// ============================================================================
// DIRECT COPY
// ============================================================================

#[tokio::test]
async fn test_matching_format_copies_source() {
    let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |_| {});

    assert_eq!(build.run_step().await, StepAction::Continue);

    assert_eq!(fs::read(build.dest()).unwrap(), SOURCE_BYTES);
    assert_eq!(build.disk_filename().await, None);
    assert_eq!(build.error().await, None);
    assert!(build.driver.invocations().is_empty());
    assert!(build.ui.messages().is_empty());
}

/// The skip flags only gate conversion. A source that already matches the
/// target format is copied even when no disk image was requested or a
/// backing file is in use. This is current behavior, kept as-is; it is not
/// asserted to be the right policy.
#[tokio::test]
async fn test_matching_format_copies_regardless_of_skip_flags() {
    for (disk_image, use_backing_file) in [(false, false), (true, true), (false, true)] {
        let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |c| {
            c.disk_image = disk_image;
            c.use_backing_file = use_backing_file;
        });

        assert_eq!(build.run_step().await, StepAction::Continue);
        assert_eq!(fs::read(build.dest()).unwrap(), SOURCE_BYTES);
        assert_eq!(build.disk_filename().await, None);
    }
}

#[tokio::test]
async fn test_copy_is_idempotent() {
    let build = TestBuild::new(RecordingDriver::with_format("raw"), |c| {
        c.format = "raw".into();
    });

    assert_eq!(build.run_step().await, StepAction::Continue);
    let first = fs::read(build.dest()).unwrap();
    assert_eq!(build.run_step().await, StepAction::Continue);
    let second = fs::read(build.dest()).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, SOURCE_BYTES);
}

#[tokio::test]
async fn test_copy_failure_halts_and_records_error() {
    let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |_| {});
    // The destination is a directory, so it cannot be opened for writing.
    fs::create_dir_all(build.dest()).unwrap();

    assert_eq!(build.run_step().await, StepAction::Halt);

    let err = build.error().await.expect("error recorded");
    assert!(matches!(err, BuildError::Copy(_)));
    assert_eq!(build.ui.errors(), vec![err.to_string()]);
    assert!(build.ui.says().is_empty());
    assert_eq!(build.disk_filename().await, None);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_copy_leaves_no_partial_disk() {
    let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |_| {});
    // A directory opens fine as the source, then fails on the first read,
    // after the destination was already created.
    fs::remove_file(&build.source).unwrap();
    fs::create_dir(&build.source).unwrap();

    assert_eq!(build.run_step().await, StepAction::Halt);

    assert!(matches!(build.error().await, Some(BuildError::Copy(_))));
    assert_eq!(build.ui.errors().len(), 1);
    assert!(!build.dest().exists());
    assert_eq!(build.disk_filename().await, None);
}

// ============================================================================
// SKIP
// ============================================================================

#[tokio::test]
async fn test_mismatch_without_disk_image_skips() {
    let build = TestBuild::new(RecordingDriver::with_format("raw"), |c| {
        c.disk_image = false;
    });

    assert_eq!(build.run_step().await, StepAction::Continue);

    assert!(!build.dest().exists());
    assert_eq!(build.disk_filename().await, None);
    assert!(build.driver.invocations().is_empty());
    assert!(build.ui.messages().is_empty());
}

#[tokio::test]
async fn test_mismatch_with_backing_file_skips() {
    let build = TestBuild::new(RecordingDriver::with_format("raw"), |c| {
        c.use_backing_file = true;
    });

    assert_eq!(build.run_step().await, StepAction::Continue);

    assert!(!build.dest().exists());
    assert_eq!(build.disk_filename().await, None);
    assert!(build.driver.invocations().is_empty());
}

// ============================================================================
// CONVERSION
// ============================================================================

#[tokio::test]
async fn test_raw_source_is_converted_to_qcow2() {
    let build = TestBuild::new(RecordingDriver::with_format("raw"), |_| {});

    assert_eq!(build.run_step().await, StepAction::Continue);

    assert_eq!(
        build.driver.invocations(),
        vec![expected_convert_args(&build, "qcow2")]
    );
    assert_eq!(build.disk_filename().await.as_deref(), Some("vm1"));
    assert_eq!(build.ui.says(), vec![CONVERT_PROGRESS_MESSAGE]);
    assert!(build.ui.errors().is_empty());
}

#[tokio::test]
async fn test_failed_inspection_falls_through_to_conversion() {
    let build = TestBuild::new(RecordingDriver::failing_inspection("corrupt header"), |_| {});

    assert_eq!(build.run_step().await, StepAction::Continue);

    assert_eq!(build.driver.inspected(), vec![build.source.clone()]);
    assert_eq!(build.driver.invocations().len(), 1);
    assert_eq!(build.disk_filename().await.as_deref(), Some("vm1"));
    assert_eq!(build.error().await, None);
}

#[tokio::test]
async fn test_conversion_failure_halts() {
    let build = TestBuild::new(
        RecordingDriver::with_format("raw").fail_conversion("qemu-img exited with 1"),
        |_| {},
    );

    assert_eq!(build.run_step().await, StepAction::Halt);

    let err = build.error().await.expect("error recorded");
    assert!(matches!(&err, BuildError::Conversion(msg) if msg.contains("exited with 1")));
    assert_eq!(build.ui.says(), vec![CONVERT_PROGRESS_MESSAGE]);
    assert_eq!(build.ui.errors().len(), 1);
    assert_eq!(build.disk_filename().await, None);
}

// ============================================================================
// FULL PIPELINE
// ============================================================================

#[tokio::test]
async fn test_pipeline_creates_output_dir_and_converts() {
    let build = TestBuild::new(RecordingDriver::with_format("raw").write_output(), |_| {});

    let report = build.run_pipeline().await;

    assert_eq!(report.action, StepAction::Continue);
    assert_eq!(
        report.metrics.steps_run(),
        vec!["prepare_output_dir", "copy_disk"]
    );
    assert_eq!(fs::read_to_string(build.dest()).unwrap(), "converted:qcow2");
    assert_eq!(build.disk_filename().await.as_deref(), Some("vm1"));
}

#[tokio::test]
async fn test_pipeline_halt_removes_created_output_dir() {
    let build = TestBuild::new(RecordingDriver::with_format("raw").fail_conversion("boom"), |_| {});

    let report = build.run_pipeline().await;

    assert_eq!(report.action, StepAction::Halt);
    assert!(!report.cancelled);
    assert!(!build.output_dir.exists());
    assert!(matches!(build.error().await, Some(BuildError::Conversion(_))));
}

#[tokio::test]
async fn test_pipeline_refuses_non_empty_output_dir() {
    let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |_| {});
    fs::create_dir_all(&build.output_dir).unwrap();
    fs::write(build.output_dir.join("previous.img"), b"old").unwrap();

    let report = build.run_pipeline().await;

    assert_eq!(report.action, StepAction::Halt);
    assert_eq!(report.metrics.steps_run(), vec!["prepare_output_dir"]);
    assert!(matches!(build.error().await, Some(BuildError::Storage(_))));
    // Not created by this run, so it is left alone.
    assert!(build.output_dir.join("previous.img").exists());
    assert!(build.driver.inspected().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let build = TestBuild::new(RecordingDriver::with_format("qcow2"), |_| {});
    let cancel = CancellationToken::new();
    cancel.cancel();

    let pipeline: Pipeline<BuildCtx> = disk_pipeline();
    let report = PipelineExecutor::execute(pipeline, build.ctx.clone(), &cancel).await;

    assert_eq!(report.action, StepAction::Halt);
    assert!(report.cancelled);
    assert!(report.metrics.steps.is_empty());
    assert!(!build.output_dir.exists());
    assert!(matches!(build.error().await, Some(BuildError::Cancelled(_))));
}
