//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for adaptation jobs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adapt_models::{JobId, JobState};

/// Initialize tracing: human readable by default, JSON when `LOG_FORMAT=json`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("adapt=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Job logger for structured logging with consistent formatting.
///
/// Every line carries the batch, job and format so interleaved output from
/// concurrent jobs can be told apart.
#[derive(Debug, Clone)]
pub struct JobLogger {
    batch_id: String,
    job_id: String,
    format: String,
}

impl JobLogger {
    /// Create a new job logger for a job rendering `format`.
    pub fn new(batch_id: &str, job_id: &JobId, format: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            job_id: job_id.to_string(),
            format: format.to_string(),
        }
    }

    /// Log a state transition.
    pub fn log_state(&self, state: JobState) {
        info!(
            batch_id = %self.batch_id,
            job_id = %self.job_id,
            format = %self.format,
            state = %state,
            "Job {}", state
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            batch_id = %self.batch_id,
            job_id = %self.job_id,
            format = %self.format,
            "Job warning: {}", message
        );
    }

    /// Log a job failure.
    pub fn log_error(&self, message: &str) {
        error!(
            batch_id = %self.batch_id,
            job_id = %self.job_id,
            format = %self.format,
            "Job failed: {}", message
        );
    }

    /// Log the completion of a job.
    pub fn log_completion(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            job_id = %self.job_id,
            format = %self.format,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            batch_id = %self.batch_id,
            job_id = %self.job_id,
            format = %self.format
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new("batch-1", &job_id, "LED_960x320");

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.format(), "LED_960x320");
    }
}
