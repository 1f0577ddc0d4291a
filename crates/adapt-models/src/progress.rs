//! Progress events emitted on every job state transition.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, JobState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub format_name: String,
    pub state: JobState,
    /// Render progress, 0-100, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, format_name: impl Into<String>, state: JobState) -> Self {
        Self {
            job_id,
            format_name: format_name.into(),
            state,
            percent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent.min(100));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_clamped() {
        let event = ProgressEvent::new(JobId::new(), "LED_960x320", JobState::Rendering).with_percent(140);
        assert_eq!(event.percent, Some(100));
    }
}
