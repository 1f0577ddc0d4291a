//! Batch requests and results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::{AdaptMode, CompositionOptions, JobReport, JobState, VideoAsset};

/// Default ROI frame sampling rate (frames per second).
pub const DEFAULT_SAMPLING_RATE: f64 = 0.6;
/// Default cap on frames sent for ROI detection.
pub const DEFAULT_MAX_FRAMES: u32 = 10;

/// Unique identifier for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How much the batch relies on ROI detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoiGuidance {
    /// No detection; jobs go straight to planning
    Disabled,
    /// Detect, and fall back to centered planning if detection is unavailable
    #[default]
    Optional,
    /// Detect, and fail the job if detection is unavailable
    Required,
}

impl RoiGuidance {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoiGuidance::Disabled => "off",
            RoiGuidance::Optional => "optional",
            RoiGuidance::Required => "required",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, RoiGuidance::Disabled)
    }
}

impl fmt::Display for RoiGuidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown ROI guidance: {0}, expected off|optional|required")]
pub struct RoiGuidanceParseError(String);

impl FromStr for RoiGuidance {
    type Err = RoiGuidanceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "disabled" | "none" => Ok(RoiGuidance::Disabled),
            "optional" | "on" => Ok(RoiGuidance::Optional),
            "required" => Ok(RoiGuidance::Required),
            _ => Err(RoiGuidanceParseError(s.to_string())),
        }
    }
}

/// One source asset fanned out to a set of formats.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchRequest {
    pub asset: VideoAsset,
    /// Requested format names, in request order
    pub formats: Vec<String>,
    /// Mode override; each profile's default applies when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AdaptMode>,
    #[serde(default)]
    pub composition: CompositionOptions,
    #[serde(default)]
    pub roi: RoiGuidance,
    /// Frames per second sampled for ROI detection
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Maximum frames sampled for ROI detection
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

fn default_sampling_rate() -> f64 {
    DEFAULT_SAMPLING_RATE
}

fn default_max_frames() -> u32 {
    DEFAULT_MAX_FRAMES
}

impl BatchRequest {
    pub fn new<I, S>(asset: VideoAsset, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            asset,
            formats: formats.into_iter().map(Into::into).collect(),
            mode: None,
            composition: CompositionOptions::default(),
            roi: RoiGuidance::default(),
            sampling_rate: DEFAULT_SAMPLING_RATE,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }

    /// Single-format request; runs through the same batch path.
    pub fn single(asset: VideoAsset, format: impl Into<String>) -> Self {
        Self::new(asset, [format.into()])
    }

    pub fn with_mode(mut self, mode: AdaptMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_composition(mut self, composition: CompositionOptions) -> Self {
        self.composition = composition;
        self
    }

    pub fn with_roi(mut self, roi: RoiGuidance) -> Self {
        self.roi = roi;
        self
    }

    pub fn with_sampling(mut self, sampling_rate: f64, max_frames: u32) -> Self {
        self.sampling_rate = sampling_rate;
        self.max_frames = max_frames;
        self
    }

    /// Requested names with duplicates removed, first occurrence wins.
    pub fn unique_formats(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.formats
            .iter()
            .filter(|name| seen.insert(name.trim().to_ascii_uppercase()))
            .cloned()
            .collect()
    }
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every job succeeded
    Success,
    /// Some jobs succeeded
    Partial,
    /// No job succeeded
    Failure,
}

impl BatchStatus {
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        if total > 0 && succeeded == total {
            BatchStatus::Success
        } else if succeeded > 0 {
            BatchStatus::Partial
        } else {
            BatchStatus::Failure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Success => "success",
            BatchStatus::Partial => "partial",
            BatchStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output file name inside a batch: `{format_name}.{extension}`.
pub fn output_file_name(format_name: &str, extension: &str) -> String {
    format!("{}.{}", format_name, extension)
}

/// Per-format outcomes of one batch, keyed by format name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult {
    pub batch_id: BatchId,
    /// Source file the batch adapted
    pub source: PathBuf,
    pub jobs: BTreeMap<String, JobReport>,
    pub status: BatchStatus,
    /// Cancellation was requested before every job finished
    #[serde(default)]
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Assemble the result once every job is terminal.
    pub fn new(
        batch_id: BatchId,
        source: PathBuf,
        jobs: BTreeMap<String, JobReport>,
        cancelled: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let succeeded = jobs.values().filter(|j| j.state == JobState::Done).count();
        let status = BatchStatus::from_counts(succeeded, jobs.len());
        Self {
            batch_id,
            source,
            jobs,
            status,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.values().filter(|j| j.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.values().filter(|j| j.state == JobState::Failed)
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    /// Archive entry name to rendered path, present only when more than
    /// one format succeeded.
    pub fn archive_manifest(&self) -> Option<BTreeMap<String, PathBuf>> {
        let manifest: BTreeMap<String, PathBuf> = self
            .succeeded()
            .filter_map(|job| {
                let output = job.output.as_ref()?;
                let name = output.file_name()?.to_string_lossy().into_owned();
                Some((name, output.clone()))
            })
            .collect();

        (manifest.len() > 1).then_some(manifest)
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
