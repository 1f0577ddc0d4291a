//! Batch orchestration: one source, many target formats.
//!
//! Every requested format becomes an independent job running in its own task
//! under a bounded worker pool. Jobs share only read-only inputs (asset,
//! profiles, ROI detection result); plans, stages and scratch files are
//! private to each job. A single-format run is a batch of one.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, OnceCell, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn, Instrument};

use adapt_media::{
    move_file, CompositionPipeline, ExecutionBackend, GeometryPlanner, MediaError, OutputSpec, RenderControl,
    RenderProgress,
};
use adapt_models::{
    output_file_name, AdaptMode, BatchId, BatchRequest, BatchResult, CompositionOptions, EncodingConfig,
    FormatProfile, FormatRegistry, JobReport, JobState, ProgressEvent, RoiBox, RoiGuidance, VideoAsset,
};
use adapt_roi::{RoiProvider, SamplingParams};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::observer::ProgressObserver;
use crate::retry::{retry_async, RetryConfig};
use crate::workspace::JobWorkspace;

/// Fans a source out to target formats and collects the results.
pub struct BatchOrchestrator {
    config: WorkerConfig,
    registry: Arc<FormatRegistry>,
    planner: GeometryPlanner,
    pipeline: CompositionPipeline,
    roi_provider: Arc<dyn RoiProvider>,
    backend: Arc<dyn ExecutionBackend>,
    retry: RetryConfig,
}

impl BatchOrchestrator {
    pub fn new(
        config: WorkerConfig,
        registry: Arc<FormatRegistry>,
        roi_provider: Arc<dyn RoiProvider>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        let planner = GeometryPlanner::new(config.planner_config());
        let retry = RetryConfig::new("render").with_max_retries(config.render_retries);
        Self {
            config,
            registry,
            planner,
            pipeline: CompositionPipeline::default(),
            roi_provider,
            backend,
            retry,
        }
    }

    pub fn with_pipeline(mut self, pipeline: CompositionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Run a batch to completion.
    pub async fn run(&self, request: BatchRequest, observer: Arc<dyn ProgressObserver>) -> BatchResult {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancel(request, observer, cancel_rx).await
    }

    /// Run a batch, stopping early once `cancel` flips to `true`.
    ///
    /// Jobs that have not started fail as `Cancelled`, in-flight renders are
    /// aborted, and finished jobs keep their results.
    pub async fn run_with_cancel(
        &self,
        request: BatchRequest,
        observer: Arc<dyn ProgressObserver>,
        cancel: watch::Receiver<bool>,
    ) -> BatchResult {
        let batch_id = BatchId::new();
        let started_at = Utc::now();
        let start = Instant::now();
        let formats = request.unique_formats();

        info!(
            batch_id = %batch_id,
            source = %request.asset.display_name(),
            formats = ?formats,
            roi = %request.roi,
            "Starting batch"
        );

        let ctx = Arc::new(BatchContext {
            batch_id: batch_id.clone(),
            asset: request.asset.clone(),
            mode: request.mode,
            composition: request.composition,
            roi: request.roi,
            sampling: SamplingParams::new(request.sampling_rate, request.max_frames),
            planner: self.planner.clone(),
            pipeline: self.pipeline.clone(),
            roi_provider: Arc::clone(&self.roi_provider),
            backend: Arc::clone(&self.backend),
            retry: self.retry.clone(),
            encoding: self.config.encoding(),
            work_dir: self.config.work_dir.clone(),
            output_dir: self.config.output_dir.join(batch_id.as_str()),
            observer,
            cancel: cancel.clone(),
            detection: OnceCell::new(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs.max(1)));
        let mut reports: BTreeMap<String, JobReport> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for name in formats {
            let Some(profile) = self.registry.resolve(&name) else {
                let report = JobReport::queued(name.trim());
                ctx.emit(&report, None);
                let report = ctx.fail(report, &WorkerError::unknown_format(name.trim()));
                reports.insert(name.trim().to_string(), report);
                continue;
            };

            // Jobs are keyed and reported by the canonical profile name
            let report = JobReport::queued(profile.name.clone());
            ctx.emit(&report, None);
            reports.insert(profile.name.clone(), report.clone());

            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let key = profile.name.clone();
                let report = match acquire_slot(semaphore, ctx.cancel.clone()).await {
                    Some(_permit) => ctx.run_job(report, profile).await,
                    None => ctx.fail(report, &WorkerError::Cancelled),
                };
                (key, report)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, report)) => {
                    reports.insert(key, report);
                }
                Err(e) => error!(batch_id = %batch_id, "Job task aborted: {}", e),
            }
        }

        // A panicked task leaves its report non-terminal
        for report in reports.values_mut() {
            if !report.state.is_terminal() {
                let failed = ctx.fail(report.clone(), &WorkerError::job_failed("job task aborted"));
                *report = failed;
            }
        }

        let was_cancelled = *cancel.borrow();
        let result = BatchResult::new(batch_id, request.asset.path.clone(), reports, was_cancelled, started_at);
        crate::metrics::record_batch(result.status, start.elapsed().as_secs_f64());

        info!(
            batch_id = %result.batch_id,
            status = %result.status,
            succeeded = result.succeeded_count(),
            total = result.jobs.len(),
            cancelled = was_cancelled,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch finished"
        );

        result
    }
}

/// Wait for a worker slot unless the batch is cancelled first.
async fn acquire_slot(semaphore: Arc<Semaphore>, cancel: watch::Receiver<bool>) -> Option<OwnedSemaphorePermit> {
    let permit = tokio::select! {
        biased;
        _ = cancelled(cancel.clone()) => return None,
        permit = semaphore.acquire_owned() => permit.ok()?,
    };
    if *cancel.borrow() {
        return None;
    }
    Some(permit)
}

/// Resolves once `cancel` is `true`. A dropped sender never cancels.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// ROI detection result shared by every job of a batch.
#[derive(Debug, Clone)]
enum Detection {
    Found(Arc<Vec<RoiBox>>),
    Unavailable(String),
}

/// Read-only state shared by the jobs of one batch.
struct BatchContext {
    batch_id: BatchId,
    asset: VideoAsset,
    mode: Option<AdaptMode>,
    composition: CompositionOptions,
    roi: RoiGuidance,
    sampling: SamplingParams,
    planner: GeometryPlanner,
    pipeline: CompositionPipeline,
    roi_provider: Arc<dyn RoiProvider>,
    backend: Arc<dyn ExecutionBackend>,
    retry: RetryConfig,
    encoding: EncodingConfig,
    work_dir: PathBuf,
    output_dir: PathBuf,
    observer: Arc<dyn ProgressObserver>,
    cancel: watch::Receiver<bool>,
    detection: OnceCell<Detection>,
}

impl BatchContext {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn emit(&self, report: &JobReport, percent: Option<u8>) {
        let mut event = ProgressEvent::new(report.job_id.clone(), report.format_name.clone(), report.state);
        if let Some(percent) = percent {
            event = event.with_percent(percent);
        }
        self.observer.on_event(&event);
    }

    fn logger(&self, report: &JobReport) -> JobLogger {
        JobLogger::new(self.batch_id.as_str(), &report.job_id, &report.format_name)
    }

    fn transition(&self, report: &mut JobReport, state: JobState) {
        debug_assert!(report.state.can_transition_to(state), "{} -> {}", report.state, state);
        report.state = state;
        self.logger(report).log_state(state);
        self.emit(report, None);
    }

    fn fail(&self, report: JobReport, err: &WorkerError) -> JobReport {
        let kind = err.failure_kind();
        let report = report.fail(kind, err.to_string());
        self.logger(&report).log_error(&err.to_string());
        crate::metrics::record_job_failed(&report.format_name, kind);
        self.emit(&report, None);
        report
    }

    /// Drive one job to a terminal state. Never returns a non-terminal report.
    async fn run_job(&self, report: JobReport, profile: Arc<FormatProfile>) -> JobReport {
        let span = self.logger(&report).create_span();
        let mut report = report;
        async move {
            match self.execute(&mut report, &profile).await {
                Ok(output) => {
                    self.logger(&report).log_completion(&output.display().to_string());
                    let report = report.complete(output);
                    crate::metrics::record_job_completed(&report.format_name);
                    self.emit(&report, Some(100));
                    report
                }
                Err(e) => self.fail(report, &e),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, report: &mut JobReport, profile: &Arc<FormatProfile>) -> WorkerResult<PathBuf> {
        let rois = if self.roi.is_enabled() {
            self.transition(report, JobState::Analyzing);
            self.analyze(report).await?
        } else {
            Arc::new(Vec::new())
        };

        if self.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        self.transition(report, JobState::Planning);
        let mode = self.mode.unwrap_or(profile.default_mode);
        report.mode = Some(mode);
        let plan = self.planner.plan(self.asset.geometry(), profile, mode, &rois)?;
        let stages = self.pipeline.compose(&plan, &self.composition);
        report.plan = Some(plan);

        if self.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        self.transition(report, JobState::Rendering);
        let workspace = JobWorkspace::create(&self.work_dir, report.job_id.as_str()).await?;
        let file_name = output_file_name(&profile.name, self.encoding.extension());
        let output = OutputSpec {
            path: workspace.file(&file_name),
            width: profile.width,
            height: profile.height,
            fps: profile.fps,
            encoding: self.encoding.clone(),
        };
        let control = RenderControl::default()
            .with_cancel(self.cancel.clone())
            .with_progress(self.asset.duration, self.progress_callback(report));

        let start = Instant::now();
        let outcome = retry_async(
            &self.retry,
            |e: &MediaError| e.is_retryable(),
            || {
                self.backend
                    .render(self.asset.path(), &stages, &output, control.clone())
            },
        )
        .await;
        report.attempts = outcome.attempts;
        crate::metrics::record_render_attempts(self.backend.name(), outcome.attempts);
        crate::metrics::record_render_duration(&profile.name, start.elapsed().as_secs_f64());

        let rendered = outcome.result?;
        let destination = self.output_dir.join(&file_name);
        move_file(&rendered, &destination).await?;

        Ok(destination)
    }

    /// Run (or join) the batch's ROI detection and apply the guidance policy.
    async fn analyze(&self, report: &mut JobReport) -> WorkerResult<Arc<Vec<RoiBox>>> {
        let detection = tokio::select! {
            detection = self.detection.get_or_init(|| self.detect()) => detection.clone(),
            _ = cancelled(self.cancel.clone()) => return Err(WorkerError::Cancelled),
        };

        match detection {
            Detection::Found(boxes) => {
                report.roi_count = boxes.len();
                Ok(boxes)
            }
            Detection::Unavailable(reason) if self.roi == RoiGuidance::Required => {
                Err(WorkerError::detection_required(reason))
            }
            Detection::Unavailable(reason) => {
                self.logger(report)
                    .log_warning(&format!("ROI detection unavailable, using centered crop: {}", reason));
                report.roi_fallback = true;
                crate::metrics::record_roi_fallback(self.roi_provider.name());
                Ok(Arc::new(Vec::new()))
            }
        }
    }

    async fn detect(&self) -> Detection {
        let start = Instant::now();
        match self.roi_provider.detect(&self.asset, &self.sampling).await {
            Ok(boxes) => {
                info!(
                    batch_id = %self.batch_id,
                    provider = self.roi_provider.name(),
                    boxes = boxes.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "ROI detection complete"
                );
                Detection::Found(Arc::new(boxes))
            }
            Err(e) => {
                let e = e.into_unavailable();
                warn!(batch_id = %self.batch_id, provider = self.roi_provider.name(), "{}", e);
                Detection::Unavailable(e.to_string())
            }
        }
    }

    /// Forward render percentages as Rendering events, skipping repeats.
    fn progress_callback(&self, report: &JobReport) -> RenderProgress {
        let observer = Arc::clone(&self.observer);
        let job_id = report.job_id.clone();
        let format_name = report.format_name.clone();
        let last = Arc::new(AtomicU8::new(u8::MAX));
        Arc::new(move |percent: u8| {
            if last.swap(percent, Ordering::Relaxed) != percent {
                let event =
                    ProgressEvent::new(job_id.clone(), format_name.clone(), JobState::Rendering).with_percent(percent);
                observer.on_event(&event);
            }
        })
    }
}
