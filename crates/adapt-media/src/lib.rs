//! Geometry planning, render composition and FFmpeg execution.
//!
//! This crate provides:
//! - The geometry planner turning source geometry, a target profile and ROIs
//!   into an adaptation plan (crop window or pad specification)
//! - The composition pipeline expanding plans into ordered render stages
//! - The execution backend trait and its FFmpeg implementation
//! - FFprobe source inspection and frame sampling for ROI detection

pub mod backend;
pub mod command;
pub mod composition;
pub mod error;
pub mod filters;
pub mod frames;
pub mod fs_utils;
pub mod planner;
pub mod probe;
pub mod progress;

pub use backend::{ExecutionBackend, FfmpegBackend, OutputSpec, RenderControl, RenderProgress};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use composition::{CompositionConfig, CompositionPipeline, RenderPlan, RenderStage};
pub use error::{MediaError, MediaResult};
pub use filters::{build_filter_graph, FilterGraph};
pub use frames::{extract_frames, SampledFrame};
pub use fs_utils::move_file;
pub use planner::{GeometryPlanner, PlannerConfig, ProtectConfig, ProtectRegion};
pub use probe::{probe_asset, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
