//! Shared data models for the campaign adaptation engine.
//!
//! This crate provides Serde-serializable types for:
//! - Source video assets and target format profiles
//! - Regions of interest produced by detection
//! - Adaptation plans (crop windows and pad specifications)
//! - Jobs, batch results and progress events
//! - Encoding configuration

pub mod batch;
pub mod encoding;
pub mod format;
pub mod geometry;
pub mod job;
pub mod mode;
pub mod plan;
pub mod progress;
pub mod roi;
pub mod video;

// Re-export common types
pub use batch::{output_file_name, BatchId, BatchRequest, BatchResult, BatchStatus, RoiGuidance};
pub use encoding::{EncodingConfig, QualityPreset};
pub use format::{
    validate_profile_name, FormatCategory, FormatProfile, FormatRegistry, FormatRegistryBuilder, FormatSpecError,
};
pub use geometry::{BoundingBox, CropWindow, SourceGeometry};
pub use job::{FailureKind, JobFailure, JobId, JobReport, JobState};
pub use mode::{AdaptMode, AdaptModeParseError, CompositionOptions};
pub use plan::{AdaptationPlan, Bars, PadSpec, PlanGeometry};
pub use progress::ProgressEvent;
pub use roi::{RoiBox, RoiCategory};
pub use video::{VideoAsset, VideoId};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized rectangle (0.0 to 1.0) representing a relative region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRect {
    /// X coordinate of the top-left corner (0.0 = left, 1.0 = right)
    pub x: f64,
    /// Y coordinate of the top-left corner (0.0 = top, 1.0 = bottom)
    pub y: f64,
    /// Width of the rectangle (0.0 to 1.0)
    pub width: f64,
    /// Height of the rectangle (0.0 to 1.0)
    pub height: f64,
}

impl NormalizedRect {
    /// Create a new normalized rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the rectangle is valid (within 0.0-1.0 range).
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001 // Allow small epsilon for float precision
            && self.y + self.height <= 1.001
    }

    /// Project onto a frame of the given pixel size.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        BoundingBox::new(self.x * fw, self.y * fh, self.width * fw, self.height * fh)
    }
}
