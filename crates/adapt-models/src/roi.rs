//! Regions of interest produced by detection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::BoundingBox;

/// What a detected region contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoiCategory {
    Logo,
    Text,
    Face,
    Generic,
}

impl RoiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoiCategory::Logo => "logo",
            RoiCategory::Text => "text",
            RoiCategory::Face => "face",
            RoiCategory::Generic => "generic",
        }
    }
}

impl fmt::Display for RoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown ROI category: {0}")]
pub struct RoiCategoryParseError(String);

impl FromStr for RoiCategory {
    type Err = RoiCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logo" | "brand" => Ok(RoiCategory::Logo),
            "text" | "cta" | "caption" => Ok(RoiCategory::Text),
            "face" | "person" => Ok(RoiCategory::Face),
            "generic" | "object" | "product" => Ok(RoiCategory::Generic),
            _ => Err(RoiCategoryParseError(s.to_string())),
        }
    }
}

/// A detected region in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoiBox {
    /// Time of the sampled frame, in seconds
    pub timestamp: f64,
    /// Region in source pixels
    pub bbox: BoundingBox,
    pub category: RoiCategory,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

impl RoiBox {
    pub fn new(timestamp: f64, bbox: BoundingBox, category: RoiCategory, confidence: f64) -> Self {
        Self {
            timestamp,
            bbox,
            category,
            confidence,
        }
    }
}
