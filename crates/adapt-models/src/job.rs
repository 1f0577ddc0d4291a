//! Per-format job lifecycle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{AdaptMode, AdaptationPlan};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state. Transitions only move forward.
///
/// `Queued -> Analyzing -> Planning -> Rendering -> Done`, with `Failed`
/// reachable from any non-terminal state. `Analyzing` is skipped when ROI
/// detection is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Queued,
    Analyzing,
    Planning,
    Rendering,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Analyzing => "analyzing",
            JobState::Planning => "planning",
            JobState::Rendering => "rendering",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Analyzing => 1,
            JobState::Planning => 2,
            JobState::Rendering => 3,
            JobState::Done | JobState::Failed => 4,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Failed => true,
            JobState::Done => *self == JobState::Rendering,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidGeometry,
    UnsupportedAspectRatioCombo,
    UnknownFormat,
    DetectionUnavailable,
    RenderError,
    Cancelled,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidGeometry => "invalid_geometry",
            FailureKind::UnsupportedAspectRatioCombo => "unsupported_aspect_ratio_combo",
            FailureKind::UnknownFormat => "unknown_format",
            FailureKind::DetectionUnavailable => "detection_unavailable",
            FailureKind::RenderError => "render_error",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed failure recorded on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Final report for one (asset, format) job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobReport {
    pub job_id: JobId,
    /// Format name as requested
    pub format_name: String,
    pub state: JobState,
    /// Effective mode; `None` when the format never resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AdaptMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<AdaptationPlan>,
    /// Rendered output location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    /// ROI detection failed and the job proceeded without guidance
    #[serde(default)]
    pub roi_fallback: bool,
    /// Number of ROIs that guided planning
    #[serde(default)]
    pub roi_count: usize,
    /// Render attempts made
    #[serde(default)]
    pub attempts: u32,
}

impl JobReport {
    /// A job that has not started.
    pub fn queued(format_name: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            format_name: format_name.into(),
            state: JobState::Queued,
            mode: None,
            plan: None,
            output: None,
            failure: None,
            roi_fallback: false,
            roi_count: 0,
            attempts: 0,
        }
    }

    /// Mark as failed with a typed reason.
    pub fn fail(mut self, kind: FailureKind, message: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.failure = Some(JobFailure::new(kind, message));
        self
    }

    /// Mark as done with the rendered output.
    pub fn complete(mut self, output: PathBuf) -> Self {
        self.state = JobState::Done;
        self.output = Some(output);
        self
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Done
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}
