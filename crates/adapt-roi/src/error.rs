//! ROI provider error types.

use thiserror::Error;

use adapt_media::MediaError;

pub type RoiResult<T> = Result<T, RoiError>;

#[derive(Debug, Error)]
pub enum RoiError {
    /// Detection could not be performed; callers fall back to no ROIs.
    #[error("ROI detection unavailable: {0}")]
    DetectionUnavailable(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Vision service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame sampling failed: {0}")]
    Media(#[from] MediaError),
}

impl RoiError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DetectionUnavailable(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RoiError::ServiceUnavailable(_) | RoiError::Network(_))
    }

    /// Collapse any provider failure into `DetectionUnavailable`.
    pub fn into_unavailable(self) -> Self {
        match self {
            RoiError::DetectionUnavailable(_) => self,
            other => RoiError::DetectionUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_unavailable() {
        let err = RoiError::MissingCredential("GOOGLE_API_KEY".into()).into_unavailable();
        match err {
            RoiError::DetectionUnavailable(msg) => assert!(msg.contains("GOOGLE_API_KEY")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_retryable() {
        assert!(RoiError::ServiceUnavailable("503".into()).is_retryable());
        assert!(!RoiError::InvalidResponse("bad".into()).is_retryable());
        assert!(!RoiError::unavailable("off").is_retryable());
    }
}
