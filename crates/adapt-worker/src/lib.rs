//! Batch adaptation worker.
//!
//! This crate provides:
//! - The batch orchestrator fanning one source out to many target formats
//! - Per-job scratch space, render retry and progress observers
//! - Worker configuration, structured logging and Prometheus metrics
//! - ZIP packaging of succeeded outputs

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;
pub mod orchestrator;
pub mod retry;
pub mod workspace;

pub use archive::package_archive;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use observer::{ChannelObserver, LoggingObserver, NoopObserver, ProgressObserver};
pub use orchestrator::BatchOrchestrator;
pub use retry::{retry_async, RetryConfig, RetryOutcome};
pub use workspace::JobWorkspace;
