//! Prometheus metrics for batch runs.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use adapt_models::{BatchStatus, FailureKind};

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: &str) -> WorkerResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| WorkerError::config_error(format!("invalid metrics address {}: {}", addr, e)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to install metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "adapt_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "adapt_jobs_failed_total";
    pub const RENDER_ATTEMPTS_TOTAL: &str = "adapt_render_attempts_total";
    pub const RENDER_DURATION_SECONDS: &str = "adapt_render_duration_seconds";
    pub const ROI_FALLBACK_TOTAL: &str = "adapt_roi_fallback_total";
    pub const BATCHES_TOTAL: &str = "adapt_batches_total";
    pub const BATCH_DURATION_SECONDS: &str = "adapt_batch_duration_seconds";
}

/// Record a job that reached Done.
pub fn record_job_completed(format: &str) {
    let labels = [("format", format.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a job that reached Failed.
pub fn record_job_failed(format: &str, kind: FailureKind) {
    let labels = [("format", format.to_string()), ("kind", kind.as_str().to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record render attempts made for one job.
pub fn record_render_attempts(backend: &str, attempts: u32) {
    let labels = [("backend", backend.to_string())];
    counter!(names::RENDER_ATTEMPTS_TOTAL, &labels).increment(attempts as u64);
}

/// Record render duration, retries included.
pub fn record_render_duration(format: &str, duration_secs: f64) {
    let labels = [("format", format.to_string())];
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a batch that continued without ROI guidance.
pub fn record_roi_fallback(provider: &str) {
    let labels = [("provider", provider.to_string())];
    counter!(names::ROI_FALLBACK_TOTAL, &labels).increment(1);
}

/// Record a finished batch.
pub fn record_batch(status: BatchStatus, duration_secs: f64) {
    let labels = [("status", status.as_str().to_string())];
    counter!(names::BATCHES_TOTAL, &labels).increment(1);
    histogram!(names::BATCH_DURATION_SECONDS).record(duration_secs);
}
