//! Composition of an adaptation plan into ordered render stages.
//!
//! The pipeline never touches pixels. It emits a declarative stage list that
//! an [`ExecutionBackend`](crate::backend::ExecutionBackend) applies in order.

use serde::{Deserialize, Serialize};

use adapt_models::{AdaptMode, AdaptationPlan, CompositionOptions, CropWindow, PlanGeometry};

/// One ordered render step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RenderStage {
    /// Scale the whole frame to the content box, then pad to the target.
    ScalePad {
        content_width: u32,
        content_height: u32,
        target_width: u32,
        target_height: u32,
        offset_x: u32,
        offset_y: u32,
        color: String,
    },
    /// Crop a source window, then scale it to the target.
    CropScale {
        window: CropWindow,
        target_width: u32,
        target_height: u32,
    },
    /// Fill the pad area with a blurred copy of the scene scaled to cover the
    /// target, with the sharp content box composited on top.
    BlurredBackground {
        target_width: u32,
        target_height: u32,
        content_width: u32,
        content_height: u32,
        offset_x: u32,
        offset_y: u32,
        blur_radius: u32,
        blur_passes: u32,
        /// Normalized point of the scene kept centered in the background
        anchor: (f64, f64),
    },
    /// Contrast and sharpening on the final composed frame.
    Enhance {
        contrast: f64,
        brightness: f64,
        saturation: f64,
        sharpen_size: u32,
        sharpen_amount: f64,
    },
}

impl RenderStage {
    pub fn name(&self) -> &'static str {
        match self {
            RenderStage::ScalePad { .. } => "scale_pad",
            RenderStage::CropScale { .. } => "crop_scale",
            RenderStage::BlurredBackground { .. } => "blurred_background",
            RenderStage::Enhance { .. } => "enhance",
        }
    }

    /// Base normalization stages derived directly from the plan geometry.
    pub fn is_geometric(&self) -> bool {
        matches!(self, RenderStage::ScalePad { .. } | RenderStage::CropScale { .. })
    }
}

/// A non-empty, ordered stage list whose first stage is geometric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderPlan(Vec<RenderStage>);

impl RenderPlan {
    fn new(base: RenderStage) -> Self {
        Self(vec![base])
    }

    fn push(&mut self, stage: RenderStage) {
        self.0.push(stage);
    }

    pub fn stages(&self) -> &[RenderStage] {
        &self.0
    }

    pub fn base(&self) -> &RenderStage {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(RenderStage::name).collect()
    }
}

impl<'a> IntoIterator for &'a RenderPlan {
    type Item = &'a RenderStage;
    type IntoIter = std::slice::Iter<'a, RenderStage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Look of the aesthetic stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Pad color for flat bars
    pub pad_color: String,
    pub blur_radius: u32,
    pub blur_passes: u32,
    pub contrast: f64,
    pub brightness: f64,
    pub saturation: f64,
    /// Unsharp mask matrix size (odd)
    pub sharpen_size: u32,
    pub sharpen_amount: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            pad_color: "black".to_string(),
            blur_radius: 20,
            blur_passes: 2,
            contrast: 1.05,
            brightness: 0.02,
            saturation: 1.08,
            sharpen_size: 5,
            sharpen_amount: 0.7,
        }
    }
}

/// Expands plans into render stages.
#[derive(Debug, Clone, Default)]
pub struct CompositionPipeline {
    config: CompositionConfig,
}

impl CompositionPipeline {
    pub fn new(config: CompositionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Compose `plan` with `options` into an ordered stage list.
    ///
    /// Order: geometric base, then background extension (FIT with padding
    /// only), then enhancement.
    pub fn compose(&self, plan: &AdaptationPlan, options: &CompositionOptions) -> RenderPlan {
        let target_width = plan.target_width();
        let target_height = plan.target_height();

        let mut stages = match &plan.geometry {
            PlanGeometry::Pad { pad } => RenderPlan::new(RenderStage::ScalePad {
                content_width: pad.content_width,
                content_height: pad.content_height,
                target_width,
                target_height,
                offset_x: pad.pad_left,
                offset_y: pad.pad_top,
                color: self.config.pad_color.clone(),
            }),
            PlanGeometry::Crop { window } => RenderPlan::new(RenderStage::CropScale {
                window: *window,
                target_width,
                target_height,
            }),
        };

        if options.blur_background && plan.mode == AdaptMode::Fit {
            if let Some(pad) = plan.pad_spec().filter(|pad| pad.has_padding()) {
                stages.push(RenderStage::BlurredBackground {
                    target_width,
                    target_height,
                    content_width: pad.content_width,
                    content_height: pad.content_height,
                    offset_x: pad.pad_left,
                    offset_y: pad.pad_top,
                    blur_radius: self.config.blur_radius,
                    blur_passes: self.config.blur_passes,
                    anchor: plan.focus.unwrap_or((0.5, 0.5)),
                });
            }
        }

        if options.legibility_boost {
            stages.push(RenderStage::Enhance {
                contrast: self.config.contrast,
                brightness: self.config.brightness,
                saturation: self.config.saturation,
                sharpen_size: self.config.sharpen_size,
                sharpen_amount: self.config.sharpen_amount,
            });
        }

        stages
    }
}
