//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use adapt_models::FailureKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while planning or rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid source geometry: {width}x{height}")]
    InvalidGeometry { width: i32, height: i32 },

    #[error("Unsupported aspect ratio combination: target {profile} is {width}x{height}")]
    UnsupportedAspectRatioCombo {
        profile: String,
        width: u32,
        height: u32,
    },

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Rendered output is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    OutputMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a render failure error.
    pub fn render_failed(message: impl Into<String>) -> Self {
        Self::RenderFailed(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Planning errors are configuration or probe problems; retrying won't help.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidGeometry { .. } | MediaError::UnsupportedAspectRatioCombo { .. }
        )
    }

    /// Render failures worth one more attempt with identical inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegFailed { .. }
                | MediaError::RenderFailed(_)
                | MediaError::OutputMismatch { .. }
                | MediaError::Timeout(_)
                | MediaError::Io(_)
        )
    }

    /// Map onto the job failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MediaError::InvalidGeometry { .. } => FailureKind::InvalidGeometry,
            MediaError::UnsupportedAspectRatioCombo { .. } => FailureKind::UnsupportedAspectRatioCombo,
            MediaError::Cancelled => FailureKind::Cancelled,
            MediaError::Internal(_) => FailureKind::Internal,
            _ => FailureKind::RenderError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        let err = MediaError::InvalidGeometry { width: 0, height: 1080 };
        assert_eq!(err.failure_kind(), FailureKind::InvalidGeometry);
        assert!(err.is_planning_error());
        assert!(!err.is_retryable());

        let err = MediaError::ffmpeg_failed("exit 1", None, Some(1));
        assert_eq!(err.failure_kind(), FailureKind::RenderError);
        assert!(err.is_retryable());

        assert!(!MediaError::Cancelled.is_retryable());
        assert_eq!(MediaError::Cancelled.failure_kind(), FailureKind::Cancelled);
    }
}
