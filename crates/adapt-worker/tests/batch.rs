//! Batch orchestrator tests against in-memory providers and backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::watch;

use adapt_media::{ExecutionBackend, MediaError, MediaResult, OutputSpec, RenderControl, RenderPlan};
use adapt_models::{
    AdaptMode, BatchRequest, BatchStatus, BoundingBox, FailureKind, FormatProfile, FormatRegistry, JobState,
    ProgressEvent, RoiBox, RoiCategory, RoiGuidance, VideoAsset,
};
use adapt_roi::{DisabledRoiProvider, FixedRoiProvider, RoiProvider, RoiResult, SamplingParams};
use adapt_worker::{package_archive, BatchOrchestrator, NoopObserver, ProgressObserver, RetryConfig, WorkerConfig};

/// Writes a placeholder file per render and records what it was asked to do.
#[derive(Default)]
struct FakeBackend {
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Remaining failures per output file stem
    failures: Mutex<HashMap<String, u32>>,
    /// Renders after this many calls wait for cancellation
    block_after: Option<u32>,
    delay: Duration,
    rendered: Mutex<Vec<(String, u32, u32)>>,
}

impl FakeBackend {
    fn failing(stem: &str, times: u32) -> Self {
        let backend = Self::default();
        backend.failures.lock().unwrap().insert(stem.to_string(), times);
        backend
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionBackend for FakeBackend {
    async fn render(
        &self,
        _source: &Path,
        _stages: &RenderPlan,
        output: &OutputSpec,
        control: RenderControl,
    ) -> MediaResult<PathBuf> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = async {
            if let Some(progress) = &control.progress {
                progress(50);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.block_after.is_some_and(|n| call >= n) {
                if let Some(mut cancel) = control.cancel.clone() {
                    let _ = cancel.wait_for(|c| *c).await;
                }
                return Err(MediaError::Cancelled);
            }

            let stem = output.path.file_stem().unwrap().to_string_lossy().into_owned();
            {
                let mut failures = self.failures.lock().unwrap();
                if let Some(remaining) = failures.get_mut(&stem) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(MediaError::render_failed("encoder crashed"));
                    }
                }
            }

            tokio::fs::write(&output.path, format!("{}x{}", output.width, output.height)).await?;
            self.rendered
                .lock()
                .unwrap()
                .push((stem, output.width, output.height));
            Ok(output.path.clone())
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Counts detection calls.
struct CountingProvider {
    calls: AtomicU32,
    boxes: Vec<RoiBox>,
}

#[async_trait]
impl RoiProvider for CountingProvider {
    async fn detect(&self, _asset: &VideoAsset, _params: &SamplingParams) -> RoiResult<Vec<RoiBox>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(self.boxes.clone())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Collects events for assertions.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl Recorder {
    /// State sequence for one format, render percentages excluded.
    fn states(&self, format: &str) -> Vec<JobState> {
        let mut states: Vec<JobState> = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            if event.format_name == format && event.percent.is_none() {
                states.push(event.state);
            }
        }
        states
    }

    fn percents(&self, format: &str) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.format_name == format)
            .filter_map(|e| e.percent)
            .collect()
    }
}

impl ProgressObserver for Recorder {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn config(&self, max_jobs: usize) -> WorkerConfig {
        WorkerConfig {
            max_concurrent_jobs: max_jobs,
            work_dir: self.dir.path().join("work"),
            output_dir: self.dir.path().join("out"),
            ..Default::default()
        }
    }

    fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn orchestrator(
        &self,
        max_jobs: usize,
        provider: Arc<dyn RoiProvider>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> BatchOrchestrator {
        self.orchestrator_with(max_jobs, FormatRegistry::builtin(), provider, backend)
    }

    fn orchestrator_with(
        &self,
        max_jobs: usize,
        registry: FormatRegistry,
        provider: Arc<dyn RoiProvider>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(self.config(max_jobs), Arc::new(registry), provider, backend).with_retry(
            RetryConfig::new("render")
                .with_max_retries(1)
                .with_base_delay(Duration::from_millis(1)),
        )
    }
}

fn asset() -> VideoAsset {
    VideoAsset::new("/campaign/spot.mp4", 1920, 1080, 15.0, 30.0)
}

fn no_roi() -> Arc<dyn RoiProvider> {
    Arc::new(DisabledRoiProvider::new())
}

#[tokio::test]
async fn test_single_format_matches_batch_member() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(2, no_roi(), Arc::new(FakeBackend::default()));

    let single_events = Arc::new(Recorder::default());
    let single = orchestrator
        .run(BatchRequest::single(asset(), "LED_960x320"), single_events.clone())
        .await;

    let batch_events = Arc::new(Recorder::default());
    let batch = orchestrator
        .run(
            BatchRequest::new(asset(), ["LED_960x320", "BILLBOARD_14x48"]),
            batch_events.clone(),
        )
        .await;

    let a = &single.jobs["LED_960x320"];
    let b = &batch.jobs["LED_960x320"];
    assert_eq!(a.state, JobState::Done);
    assert_eq!(a.state, b.state);
    assert_eq!(a.mode, b.mode);
    assert_eq!(a.attempts, b.attempts);
    assert_eq!(a.roi_fallback, b.roi_fallback);
    assert_eq!(a.failure, b.failure);
    assert_eq!(a.plan.as_ref().unwrap().geometry, b.plan.as_ref().unwrap().geometry);
    assert_eq!(
        a.output.as_ref().unwrap().file_name(),
        b.output.as_ref().unwrap().file_name()
    );

    // Same serialized fields
    let keys = |v: serde_json::Value| -> Vec<String> { v.as_object().unwrap().keys().cloned().collect() };
    assert_eq!(
        keys(serde_json::to_value(a).unwrap()),
        keys(serde_json::to_value(b).unwrap())
    );
    assert_eq!(
        keys(serde_json::to_value(&single).unwrap()),
        keys(serde_json::to_value(&batch).unwrap())
    );

    assert_eq!(single_events.states("LED_960x320"), batch_events.states("LED_960x320"));
    assert_eq!(single.status, BatchStatus::Success);
}

#[tokio::test]
async fn test_unknown_format_fails_alone() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(2, no_roi(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["LED_960x320", "NOT_A_FORMAT", "BILLBOARD_14x48"]),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(result.jobs.len(), 3);
    let failed: Vec<_> = result.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].format_name, "NOT_A_FORMAT");
    assert_eq!(failed[0].failure_kind(), Some(FailureKind::UnknownFormat));
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.status, BatchStatus::Partial);
}

#[tokio::test]
async fn test_format_names_resolve_case_insensitively() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(2, no_roi(), Arc::new(FakeBackend::default()));

    let events = Arc::new(Recorder::default());
    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["led_960x320", "LED_960X320", " nope "]),
            events.clone(),
        )
        .await;

    assert_eq!(result.jobs.len(), 2);
    assert!(result.jobs["LED_960x320"].is_success());
    assert_eq!(result.jobs["nope"].failure_kind(), Some(FailureKind::UnknownFormat));

    // Every event of a resolved job carries the canonical name, Queued included
    let names: Vec<String> = events
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.format_name.clone())
        .collect();
    assert!(names.iter().all(|n| n == "LED_960x320" || n == "nope"), "{:?}", names);
    assert_eq!(events.states("LED_960x320")[0], JobState::Queued);
    assert_eq!(events.states("nope"), vec![JobState::Queued, JobState::Failed]);
}

#[tokio::test]
async fn test_every_transition_is_reported() {
    let harness = Harness::new();
    let provider = Arc::new(FixedRoiProvider::new(Vec::new()));
    let orchestrator = harness.orchestrator(1, provider, Arc::new(FakeBackend::default()));

    let events = Arc::new(Recorder::default());
    let result = orchestrator
        .run(
            BatchRequest::single(asset(), "LED_16x9_FHD").with_roi(RoiGuidance::Optional),
            events.clone(),
        )
        .await;

    assert!(result.jobs["LED_16x9_FHD"].is_success());
    assert_eq!(
        events.states("LED_16x9_FHD"),
        vec![
            JobState::Queued,
            JobState::Analyzing,
            JobState::Planning,
            JobState::Rendering,
        ]
    );
    // Render progress, then completion at 100
    assert_eq!(events.percents("LED_16x9_FHD"), vec![50, 100]);
    let last = events.events.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.state, JobState::Done);
}

#[tokio::test]
async fn test_analyzing_skipped_without_guidance() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(1, no_roi(), Arc::new(FakeBackend::default()));

    let events = Arc::new(Recorder::default());
    orchestrator
        .run(
            BatchRequest::single(asset(), "LED_960x320").with_roi(RoiGuidance::Disabled),
            events.clone(),
        )
        .await;

    let states = events.states("LED_960x320");
    assert!(!states.contains(&JobState::Analyzing));
    assert_eq!(states[..3], [JobState::Queued, JobState::Planning, JobState::Rendering]);
}

#[tokio::test]
async fn test_render_retried_once() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::failing("LED_960x320", 1));
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());

    let result = orchestrator
        .run(BatchRequest::single(asset(), "LED_960x320"), Arc::new(NoopObserver))
        .await;

    let job = &result.jobs["LED_960x320"];
    assert!(job.is_success());
    assert_eq!(job.attempts, 2);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_second_render_failure_is_fatal_to_that_job_only() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::failing("LED_960x320", 2));
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["LED_960x320", "BILLBOARD_14x48"]),
            Arc::new(NoopObserver),
        )
        .await;

    let failed = &result.jobs["LED_960x320"];
    assert_eq!(failed.state, JobState::Failed);
    assert_eq!(failed.failure_kind(), Some(FailureKind::RenderError));
    assert_eq!(failed.attempts, 2);
    assert!(failed.output.is_none());
    assert!(result.jobs["BILLBOARD_14x48"].is_success());
    assert_eq!(result.status, BatchStatus::Partial);
}

#[tokio::test]
async fn test_detection_unavailable_falls_back_to_centered_crop() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(1, no_roi(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::single(asset(), "BILLBOARD_14x48").with_roi(RoiGuidance::Optional),
            Arc::new(NoopObserver),
        )
        .await;

    let job = &result.jobs["BILLBOARD_14x48"];
    assert!(job.is_success());
    assert!(job.roi_fallback);
    let window = job.plan.as_ref().unwrap().crop_window().copied().unwrap();
    assert_eq!((window.width, window.height), (1920, 548));
    assert_eq!(window.y, (1080 - 548) / 2);
}

#[tokio::test]
async fn test_detection_unavailable_fails_when_required() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::default());
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["BILLBOARD_14x48", "LED_960x320"]).with_roi(RoiGuidance::Required),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(result.status, BatchStatus::Failure);
    assert_eq!(result.jobs.len(), 2);
    for job in result.jobs.values() {
        assert_eq!(job.failure_kind(), Some(FailureKind::DetectionUnavailable));
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_roi_detection_runs_once_and_guides_crop() {
    let harness = Harness::new();
    let logo = RoiBox::new(0.0, BoundingBox::new(100.0, 40.0, 240.0, 90.0), RoiCategory::Logo, 0.95);
    let provider = Arc::new(CountingProvider {
        calls: AtomicU32::new(0),
        boxes: vec![logo.clone()],
    });
    let orchestrator = harness.orchestrator(3, provider.clone(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["BILLBOARD_14x48", "LED_960x320", "LED_9x16_FHD"]),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.status, BatchStatus::Success);

    for job in result.jobs.values() {
        assert_eq!(job.roi_count, 1);
        assert!(!job.roi_fallback);
        let window = job.plan.as_ref().unwrap().crop_window().copied().unwrap();
        assert!(logo.bbox.is_within(&window), "{}: {:?}", job.format_name, window);
    }

    let billboard = result.jobs["BILLBOARD_14x48"].plan.as_ref().unwrap();
    assert!(billboard.crop_window().unwrap().y < (1080 - 548) / 2);
}

#[tokio::test]
async fn test_mode_override_applies_to_every_job() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(2, no_roi(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["LED_9x16_FHD", "LED_16x9_FHD"])
                .with_roi(RoiGuidance::Disabled)
                .with_mode(AdaptMode::Fit),
            Arc::new(NoopObserver),
        )
        .await;

    let portrait = &result.jobs["LED_9x16_FHD"];
    assert_eq!(portrait.mode, Some(AdaptMode::Fit));
    let pad = portrait.plan.as_ref().unwrap().pad_spec().copied().unwrap();
    assert_eq!(pad.content_width, 1080);
    assert_eq!(pad.target_height(), 1920);
    assert!(pad.has_padding());

    let same_aspect = result.jobs["LED_16x9_FHD"].plan.as_ref().unwrap().pad_spec().copied().unwrap();
    assert!(!same_aspect.has_padding());
}

#[tokio::test]
async fn test_invalid_source_fails_every_job_but_reports_all() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::default());
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());
    let broken = VideoAsset::new("/campaign/broken.mp4", 0, 1080, 15.0, 30.0);

    let result = orchestrator
        .run(
            BatchRequest::new(broken, ["LED_960x320", "BILLBOARD_14x48", "TIKTOK_9x16"]),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(result.jobs.len(), 3);
    assert_eq!(result.status, BatchStatus::Failure);
    for job in result.jobs.values() {
        assert_eq!(job.failure_kind(), Some(FailureKind::InvalidGeometry));
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_zero_dimension_profile_is_unsupported() {
    let harness = Harness::new();
    let registry = FormatRegistry::builder()
        .with_builtins()
        .add(FormatProfile::custom("BROKEN_WALL", 0, 320, 30))
        .unwrap()
        .build();
    let orchestrator = harness.orchestrator_with(2, registry, no_roi(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["BROKEN_WALL", "LED_960x320"]),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(
        result.jobs["BROKEN_WALL"].failure_kind(),
        Some(FailureKind::UnsupportedAspectRatioCombo)
    );
    assert!(result.jobs["LED_960x320"].is_success());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend {
        delay: Duration::from_millis(20),
        ..Default::default()
    });
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());

    let result = orchestrator
        .run(
            BatchRequest::new(
                asset(),
                ["LED_960x320", "LED_256x128", "LED_800x600", "BILLBOARD_6x12", "INSTAGRAM_SQUARE"],
            ),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(result.succeeded_count(), 5);
    assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_outputs_match_profile_dimensions_and_naming() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::default());
    let orchestrator = harness.orchestrator(2, no_roi(), backend.clone());

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["BILLBOARD_14x48", "LED_256x128"]),
            Arc::new(NoopObserver),
        )
        .await;

    let mut rendered = backend.rendered.lock().unwrap().clone();
    rendered.sort();
    assert_eq!(
        rendered,
        vec![
            ("BILLBOARD_14x48".to_string(), 1680, 480),
            ("LED_256x128".to_string(), 256, 128)
        ]
    );

    let out_dir = harness.dir.path().join("out").join(result.batch_id.as_str());
    for job in result.succeeded() {
        let output = job.output.as_ref().unwrap();
        assert_eq!(output.parent().unwrap(), out_dir);
        assert_eq!(
            output.file_name().unwrap().to_string_lossy(),
            format!("{}.mp4", job.format_name)
        );
        assert!(output.exists());
    }
}

#[tokio::test]
async fn test_scratch_space_removed_on_success_and_failure() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend::failing("LED_960x320", 5));
    let orchestrator = harness.orchestrator(2, no_roi(), backend);

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["LED_960x320", "BILLBOARD_14x48"]),
            Arc::new(NoopObserver),
        )
        .await;

    assert_eq!(result.status, BatchStatus::Partial);
    let mut entries = tokio::fs::read_dir(harness.work_dir()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn test_archive_manifest_packages_succeeded_outputs() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(2, no_roi(), Arc::new(FakeBackend::default()));

    let result = orchestrator
        .run(
            BatchRequest::new(asset(), ["BILLBOARD_14x48", "LED_960x320", "NOPE"]),
            Arc::new(NoopObserver),
        )
        .await;

    let manifest = result.archive_manifest().unwrap();
    let names: Vec<&str> = manifest.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["BILLBOARD_14x48.mp4", "LED_960x320.mp4"]);

    let archive = harness.dir.path().join("out").join(format!("{}.zip", result.batch_id));
    assert!(package_archive(&manifest, &archive).await.unwrap() > 0);
    assert!(archive.exists());

    let single = orchestrator
        .run(BatchRequest::single(asset(), "LED_960x320"), Arc::new(NoopObserver))
        .await;
    assert!(single.archive_manifest().is_none());
}

#[tokio::test]
async fn test_cancellation_keeps_finished_jobs() {
    let harness = Harness::new();
    let backend = Arc::new(FakeBackend {
        block_after: Some(1),
        ..Default::default()
    });
    let orchestrator = harness.orchestrator(1, no_roi(), backend.clone());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let watcher = {
        let backend = backend.clone();
        tokio::spawn(async move {
            while backend.calls() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            cancel_tx.send(true).unwrap();
        })
    };

    let result = orchestrator
        .run_with_cancel(
            BatchRequest::new(asset(), ["LED_960x320", "BILLBOARD_14x48", "LED_256x128"])
                .with_roi(RoiGuidance::Disabled),
            Arc::new(NoopObserver),
            cancel_rx,
        )
        .await;
    watcher.await.unwrap();

    assert!(result.cancelled);
    assert_eq!(result.jobs.len(), 3);
    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.status, BatchStatus::Partial);
    for job in result.failed() {
        assert_eq!(job.failure_kind(), Some(FailureKind::Cancelled));
    }
    // Cancelled renders are not retried and the third job never starts
    assert_eq!(backend.calls(), 2);

    let done = result.succeeded().next().unwrap();
    assert!(done.output.as_ref().unwrap().exists());
}
