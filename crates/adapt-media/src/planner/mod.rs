//! Geometry planning: source geometry + target profile + ROIs -> plan.
//!
//! Planning is pure and deterministic. FIT scales the whole frame into the
//! target box and pads the remainder. FILL scales to cover the target box and
//! crops the excess, positioning the crop window so the aggregated ROI
//! protect region stays in frame whenever it can.

pub mod config;
pub mod protect;

use std::sync::Arc;

use adapt_models::{AdaptMode, AdaptationPlan, CropWindow, FormatProfile, PadSpec, PlanGeometry, RoiBox, SourceGeometry};

use crate::error::{MediaError, MediaResult};

pub use config::{PlannerConfig, ProtectConfig};
pub use protect::{aggregate, ProtectRegion};

/// Computes adaptation plans.
#[derive(Debug, Clone, Default)]
pub struct GeometryPlanner {
    config: PlannerConfig,
}

impl GeometryPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the transform of `source` onto `profile`.
    ///
    /// # Errors
    /// - `InvalidGeometry` when the source has a non-positive dimension
    /// - `UnsupportedAspectRatioCombo` when the profile declares a zero dimension
    pub fn plan(
        &self,
        source: SourceGeometry,
        profile: &Arc<FormatProfile>,
        mode: AdaptMode,
        rois: &[RoiBox],
    ) -> MediaResult<AdaptationPlan> {
        if !source.is_valid() {
            return Err(MediaError::InvalidGeometry {
                width: source.width,
                height: source.height,
            });
        }
        if profile.width == 0 || profile.height == 0 {
            return Err(MediaError::UnsupportedAspectRatioCombo {
                profile: profile.name.clone(),
                width: profile.width,
                height: profile.height,
            });
        }

        let region = protect::aggregate(rois, source, &self.config.protect);
        let focus = region.map(|r| {
            (
                r.centroid.0 / source.width as f64,
                r.centroid.1 / source.height as f64,
            )
        });

        let geometry = match mode {
            AdaptMode::Fit => PlanGeometry::Pad {
                pad: self.plan_fit(source, profile),
            },
            AdaptMode::Fill => PlanGeometry::Crop {
                window: self.plan_fill(source, profile, region.as_ref()),
            },
        };

        Ok(AdaptationPlan {
            profile: Arc::clone(profile),
            mode,
            source,
            geometry,
            focus,
        })
    }

    fn same_aspect(&self, source_ratio: f64, target_ratio: f64) -> bool {
        ((source_ratio - target_ratio) / target_ratio).abs() < self.config.aspect_tolerance
    }

    /// Uniform scale = min(Wt/Ws, Ht/Hs); the fitted axis matches the target
    /// exactly and padding is split evenly on the other.
    fn plan_fit(&self, source: SourceGeometry, profile: &FormatProfile) -> PadSpec {
        let (sw, sh) = (source.width as f64, source.height as f64);
        let (tw, th) = (profile.width, profile.height);
        let source_ratio = sw / sh;
        let target_ratio = tw as f64 / th as f64;

        let (content_width, content_height) = if self.same_aspect(source_ratio, target_ratio) {
            (tw, th)
        } else if source_ratio > target_ratio {
            // Width-bound: letterbox
            let exact = sh * tw as f64 / sw;
            (tw, round_within(exact, th, profile.even_dimensions))
        } else {
            // Height-bound: pillarbox
            let exact = sw * th as f64 / sh;
            (round_within(exact, tw, profile.even_dimensions), th)
        };

        let pad_x = tw - content_width;
        let pad_y = th - content_height;
        PadSpec {
            content_width,
            content_height,
            pad_left: pad_x / 2,
            pad_right: pad_x - pad_x / 2,
            pad_top: pad_y / 2,
            pad_bottom: pad_y - pad_y / 2,
        }
    }

    /// Uniform scale = max(Wt/Ws, Ht/Hs); the crop window is the target box
    /// expressed in source pixels.
    fn plan_fill(&self, source: SourceGeometry, profile: &FormatProfile, region: Option<&ProtectRegion>) -> CropWindow {
        let (sw, sh) = (source.width as f64, source.height as f64);
        let target_ratio = profile.width as f64 / profile.height as f64;
        let source_ratio = sw / sh;

        let (exact_w, exact_h) = if self.same_aspect(source_ratio, target_ratio) {
            (sw, sh)
        } else if source_ratio > target_ratio {
            (sh * target_ratio, sh)
        } else {
            (sw, sw / target_ratio)
        };

        let width = floor_within(exact_w, source.width, profile.even_dimensions);
        let height = floor_within(exact_h, source.height, profile.even_dimensions);

        let x = position_on_axis(
            source.width,
            width,
            region.map(|r| (r.bounds.x, r.bounds.x2(), r.centroid.0)),
        );
        let y = position_on_axis(
            source.height,
            height,
            region.map(|r| (r.bounds.y, r.bounds.y2(), r.centroid.1)),
        );

        CropWindow::new(x, y, width, height)
    }
}

/// Round a scaled length to the nearest (even) integer without exceeding `limit`.
fn round_within(exact: f64, limit: u32, even: bool) -> u32 {
    let value = if even {
        let mut v = ((exact / 2.0).round() as u32) * 2;
        if v > limit {
            v -= 2;
        }
        v.max(2)
    } else {
        (exact.round() as u32).max(1)
    };
    value.min(limit)
}

/// Floor a crop length toward the interior, optionally to an even value.
fn floor_within(exact: f64, limit: i32, even: bool) -> i32 {
    // Absorb float noise like 1079.9999999 before flooring
    let floored = ((exact + 1e-6).floor() as i32).min(limit);
    let value = if even { floored & !1 } else { floored };
    value.max(if even { 2 } else { 1 }).min(limit)
}

/// Place a window of `len` pixels on an axis of `extent` pixels.
///
/// Without a region the window is centered. When the region fits, the window
/// contains it and sits as close as possible to centering the weighted
/// centroid. An oversize region has its geometric center centered instead.
/// The window never leaves `[0, extent]`.
fn position_on_axis(extent: i32, len: i32, region: Option<(f64, f64, f64)>) -> i32 {
    let max_pos = (extent - len).max(0);
    if max_pos == 0 {
        return 0;
    }

    let Some((r0, r1, centroid)) = region else {
        return max_pos / 2;
    };

    let start = r0.floor() as i32;
    let end = r1.ceil() as i32;
    let half = len as f64 / 2.0;

    if end - start <= len {
        let lo = (end - len).max(0);
        let hi = start.min(max_pos);
        let ideal = (centroid - half).round() as i32;
        ideal.clamp(lo, hi)
    } else {
        let center = (r0 + r1) / 2.0;
        ((center - half).round() as i32).clamp(0, max_pos)
    }
}
