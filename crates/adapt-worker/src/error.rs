//! Worker error types.

use thiserror::Error;

use adapt_media::MediaError;
use adapt_models::{FailureKind, FormatSpecError};
use adapt_roi::RoiError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("ROI guidance required but detection failed: {0}")]
    DetectionRequired(String),

    #[error("Batch cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Archive failed: {0}")]
    ArchiveFailed(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("ROI error: {0}")]
    Roi(#[from] RoiError),

    #[error("Format error: {0}")]
    Format(#[from] FormatSpecError),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat(name.into())
    }

    pub fn detection_required(msg: impl Into<String>) -> Self {
        Self::DetectionRequired(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn archive_failed(msg: impl Into<String>) -> Self {
        Self::ArchiveFailed(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Check if error is retryable. Only render failures are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if error came from batch cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled | WorkerError::Media(MediaError::Cancelled))
    }

    /// The failure category recorded on the job report.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            WorkerError::UnknownFormat(_) => FailureKind::UnknownFormat,
            WorkerError::DetectionRequired(_) | WorkerError::Roi(_) => FailureKind::DetectionUnavailable,
            WorkerError::Cancelled => FailureKind::Cancelled,
            WorkerError::Media(e) => e.failure_kind(),
            WorkerError::ConfigError(_)
            | WorkerError::Format(_)
            | WorkerError::ArchiveFailed(_)
            | WorkerError::JobFailed(_)
            | WorkerError::Zip(_)
            | WorkerError::Io(_) => FailureKind::Internal,
        }
    }
}
