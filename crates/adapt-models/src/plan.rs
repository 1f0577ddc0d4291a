//! Adaptation plans: the geometric decision for one (asset, format) pair.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{AdaptMode, CropWindow, FormatProfile, SourceGeometry};

/// Which padding bars a FIT plan produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Bars {
    /// Content fills the target exactly
    None,
    /// Horizontal bars above and below
    Letterbox,
    /// Vertical bars left and right
    Pillarbox,
}

/// Scaled content rectangle placed inside the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PadSpec {
    /// Scaled content width
    pub content_width: u32,
    /// Scaled content height
    pub content_height: u32,
    pub pad_left: u32,
    pub pad_right: u32,
    pub pad_top: u32,
    pub pad_bottom: u32,
}

impl PadSpec {
    /// Total output width.
    pub fn target_width(&self) -> u32 {
        self.pad_left + self.content_width + self.pad_right
    }

    /// Total output height.
    pub fn target_height(&self) -> u32 {
        self.pad_top + self.content_height + self.pad_bottom
    }

    pub fn has_padding(&self) -> bool {
        self.pad_left + self.pad_right + self.pad_top + self.pad_bottom > 0
    }

    pub fn bars(&self) -> Bars {
        if self.pad_top + self.pad_bottom > 0 {
            Bars::Letterbox
        } else if self.pad_left + self.pad_right > 0 {
            Bars::Pillarbox
        } else {
            Bars::None
        }
    }
}

/// The concrete transform of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanGeometry {
    /// FILL: crop this source window, then scale it to the target
    Crop { window: CropWindow },
    /// FIT: scale the whole frame to the content rectangle, then pad
    Pad { pad: PadSpec },
}

/// Result of planning one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdaptationPlan {
    /// Shared registry profile
    pub profile: Arc<FormatProfile>,
    pub mode: AdaptMode,
    pub source: SourceGeometry,
    pub geometry: PlanGeometry,
    /// Normalized (x, y) center of the protected content, if any ROI qualified.
    /// Used to anchor background treatments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<(f64, f64)>,
}

impl AdaptationPlan {
    pub fn target_width(&self) -> u32 {
        self.profile.width
    }

    pub fn target_height(&self) -> u32 {
        self.profile.height
    }

    pub fn crop_window(&self) -> Option<&CropWindow> {
        match &self.geometry {
            PlanGeometry::Crop { window } => Some(window),
            PlanGeometry::Pad { .. } => None,
        }
    }

    pub fn pad_spec(&self) -> Option<&PadSpec> {
        match &self.geometry {
            PlanGeometry::Pad { pad } => Some(pad),
            PlanGeometry::Crop { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(content_width: u32, content_height: u32, l: u32, r: u32, t: u32, b: u32) -> PadSpec {
        PadSpec {
            content_width,
            content_height,
            pad_left: l,
            pad_right: r,
            pad_top: t,
            pad_bottom: b,
        }
    }

    #[test]
    fn test_pad_bars() {
        assert_eq!(pad(1080, 608, 0, 0, 656, 656).bars(), Bars::Letterbox);
        assert_eq!(pad(854, 480, 413, 413, 0, 0).bars(), Bars::Pillarbox);
        let exact = pad(1920, 1080, 0, 0, 0, 0);
        assert_eq!(exact.bars(), Bars::None);
        assert!(!exact.has_padding());
    }

    #[test]
    fn test_pad_totals() {
        let spec = pad(1080, 608, 0, 0, 656, 656);
        assert_eq!(spec.target_width(), 1080);
        assert_eq!(spec.target_height(), 1920);
    }

    #[test]
    fn test_plan_accessors_and_serde() {
        let profile = Arc::new(FormatProfile::custom("WALL", 1680, 480, 30));
        let plan = AdaptationPlan {
            profile,
            mode: AdaptMode::Fill,
            source: SourceGeometry::new(1920, 1080),
            geometry: PlanGeometry::Crop {
                window: CropWindow::new(0, 200, 1920, 548),
            },
            focus: None,
        };
        assert!(plan.pad_spec().is_none());
        assert_eq!(plan.crop_window().unwrap().height, 548);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["geometry"]["kind"], "crop");
        assert_eq!(json["profile"]["name"], "WALL");
    }
}
