//! The ROI provider contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use adapt_models::batch::{DEFAULT_MAX_FRAMES, DEFAULT_SAMPLING_RATE};
use adapt_models::{RoiBox, VideoAsset};

use crate::error::RoiResult;

/// How densely the source is sampled for detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Frames per second
    pub sampling_rate: f64,
    /// Upper bound on frames analysed
    pub max_frames: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl SamplingParams {
    pub fn new(sampling_rate: f64, max_frames: u32) -> Self {
        Self {
            sampling_rate,
            max_frames,
        }
    }
}

/// Produces ROI observations for a source asset.
///
/// Boxes are in source pixel coordinates. Any failure to detect should be
/// reported as `RoiError::DetectionUnavailable`.
#[async_trait]
pub trait RoiProvider: Send + Sync {
    async fn detect(&self, asset: &VideoAsset, params: &SamplingParams) -> RoiResult<Vec<RoiBox>>;

    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;
}
