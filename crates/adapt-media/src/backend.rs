//! Execution backends: apply a render plan to the actual video bytes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

use adapt_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::composition::RenderPlan;
use crate::error::{MediaError, MediaResult};
use crate::filters::build_filter_graph;
use crate::probe::probe_video;
use crate::progress::FfmpegProgress;

/// Where and how to write a rendered artifact.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub path: PathBuf,
    /// Must equal the profile width
    pub width: u32,
    /// Must equal the profile height
    pub height: u32,
    pub fps: u32,
    pub encoding: EncodingConfig,
}

/// Receives render progress as a 0-100 percentage.
pub type RenderProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// Per-call render controls.
#[derive(Clone, Default)]
pub struct RenderControl {
    /// Flips to `true` when the render should be aborted
    pub cancel: Option<watch::Receiver<bool>>,
    /// Source duration in seconds, for percentage progress
    pub duration: Option<f64>,
    pub progress: Option<RenderProgress>,
}

impl RenderControl {
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, duration: f64, progress: RenderProgress) -> Self {
        self.duration = Some(duration);
        self.progress = Some(progress);
        self
    }
}

/// Executes render stages against a source file.
///
/// Implementations must produce output of exactly `output.width` x
/// `output.height` and should abort promptly when cancelled.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Render `stages` applied to `source` into `output.path`.
    async fn render(
        &self,
        source: &Path,
        stages: &RenderPlan,
        output: &OutputSpec,
        control: RenderControl,
    ) -> MediaResult<PathBuf>;

    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Backend driving the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    timeout_secs: Option<u64>,
    verify_output: bool,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill renders that take longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Probe every output and reject dimension mismatches.
    pub fn with_verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    /// The FFmpeg command for a render, without running it.
    pub fn build_command(&self, source: &Path, stages: &RenderPlan, output: &OutputSpec) -> MediaResult<FfmpegCommand> {
        let graph = build_filter_graph(stages)?;
        Ok(FfmpegCommand::new(source, &output.path)
            .filter_graph(&graph)
            .frame_rate(output.fps)
            .output_args(output.encoding.to_ffmpeg_args()))
    }

    async fn verify(&self, output: &OutputSpec) -> MediaResult<()> {
        let info = probe_video(&output.path).await?;
        if info.width != output.width || info.height != output.height {
            return Err(MediaError::OutputMismatch {
                expected_width: output.width,
                expected_height: output.height,
                actual_width: info.width,
                actual_height: info.height,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionBackend for FfmpegBackend {
    async fn render(
        &self,
        source: &Path,
        stages: &RenderPlan,
        output: &OutputSpec,
        control: RenderControl,
    ) -> MediaResult<PathBuf> {
        let cmd = self.build_command(source, stages, output)?;

        if let Some(parent) = output.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut runner = FfmpegRunner::new();
        if let Some(cancel) = control.cancel {
            runner = runner.with_cancel(cancel);
        }
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let total_ms = control.duration.map(|d| (d * 1000.0) as i64).unwrap_or(0);
        let progress = control.progress;

        debug!(stages = ?stages.names(), output = %output.path.display(), "Rendering");
        let start = Instant::now();

        runner
            .run_with_progress(&cmd, move |p: FfmpegProgress| {
                if let Some(callback) = &progress {
                    callback(p.percent(total_ms));
                }
            })
            .await?;

        if self.verify_output {
            self.verify(output).await?;
        }

        info!(
            output = %output.path.display(),
            width = output.width,
            height = output.height,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Render complete"
        );

        Ok(output.path.clone())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
