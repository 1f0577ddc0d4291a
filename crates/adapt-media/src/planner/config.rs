//! Tunables for geometry planning.

use serde::{Deserialize, Serialize};

use adapt_models::RoiCategory;

/// Minimum detector confidence for an ROI to be considered.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
/// Effective weight a box needs to anchor the protect region.
pub const DEFAULT_ANCHOR_WEIGHT: f64 = 0.4;
/// Relative aspect difference treated as "same aspect".
pub const DEFAULT_ASPECT_TOLERANCE: f64 = 0.001;

/// How ROI boxes are aggregated into a protect region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectConfig {
    /// Boxes below this confidence are ignored
    pub min_confidence: f64,
    pub logo_weight: f64,
    pub text_weight: f64,
    pub face_weight: f64,
    pub generic_weight: f64,
    /// Boxes at or above this effective weight define the region bounds.
    /// When none qualify, every remaining box does.
    pub anchor_weight: f64,
}

impl Default for ProtectConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            logo_weight: 1.0,
            text_weight: 1.0,
            face_weight: 1.0,
            generic_weight: 0.5,
            anchor_weight: DEFAULT_ANCHOR_WEIGHT,
        }
    }
}

impl ProtectConfig {
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn category_weight(&self, category: RoiCategory) -> f64 {
        match category {
            RoiCategory::Logo => self.logo_weight,
            RoiCategory::Text => self.text_weight,
            RoiCategory::Face => self.face_weight,
            RoiCategory::Generic => self.generic_weight,
        }
    }
}

/// Geometry planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Relative tolerance for treating source and target aspect as equal
    pub aspect_tolerance: f64,
    pub protect: ProtectConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            aspect_tolerance: DEFAULT_ASPECT_TOLERANCE,
            protect: ProtectConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn with_protect(mut self, protect: ProtectConfig) -> Self {
        self.protect = protect;
        self
    }
}
