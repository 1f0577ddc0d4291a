//! FFmpeg filter graphs for render stages.

use crate::composition::{RenderPlan, RenderStage};
use crate::error::{MediaError, MediaResult};

/// Output label of complex graphs.
pub const VIDEO_OUT_LABEL: &str = "vout";

/// A filter graph ready to be attached to an FFmpeg command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterGraph {
    /// Linear chain, passed with `-vf`
    Simple(String),
    /// Multi-branch graph, passed with `-filter_complex` and mapped by label
    Complex(String),
}

impl FilterGraph {
    pub fn as_str(&self) -> &str {
        match self {
            FilterGraph::Simple(s) | FilterGraph::Complex(s) => s,
        }
    }
}

/// `scale=CW:CH,pad=TW:TH:X:Y:color=C`
pub fn filter_scale_pad(cw: u32, ch: u32, tw: u32, th: u32, x: u32, y: u32, color: &str) -> String {
    format!("scale={}:{},pad={}:{}:{}:{}:color={}", cw, ch, tw, th, x, y, color)
}

/// `crop=W:H:X:Y,scale=TW:TH`
pub fn filter_crop_scale(w: i32, h: i32, x: i32, y: i32, tw: u32, th: u32) -> String {
    format!("crop={}:{}:{}:{},scale={}:{}", w, h, x, y, tw, th)
}

/// Background branch: cover the target, crop around the anchor, blur.
pub fn filter_blur_background(tw: u32, th: u32, anchor: (f64, f64), radius: u32, passes: u32) -> String {
    let ax = anchor.0.clamp(0.0, 1.0);
    let ay = anchor.1.clamp(0.0, 1.0);
    format!(
        "scale={tw}:{th}:force_original_aspect_ratio=increase,\
         crop={tw}:{th}:max(0\\,min(iw-ow\\,iw*{ax:.4}-ow/2)):max(0\\,min(ih-oh\\,ih*{ay:.4}-oh/2)),\
         boxblur={radius}:{passes}"
    )
}

/// `eq=...,unsharp=...`
pub fn filter_enhance(contrast: f64, brightness: f64, saturation: f64, size: u32, amount: f64) -> String {
    format!(
        "eq=contrast={}:brightness={}:saturation={},unsharp=lx={}:ly={}:la={}",
        contrast, brightness, saturation, size, size, amount
    )
}

/// Translate a stage list into a filter graph ending in `setsar=1`.
///
/// A background stage must directly follow the scale+pad stage it replaces
/// the bars of.
pub fn build_filter_graph(plan: &RenderPlan) -> MediaResult<FilterGraph> {
    let stages = plan.stages();
    let mut chain: Vec<String> = Vec::new();
    let mut complex_head: Option<String> = None;

    let mut i = 0;
    while i < stages.len() {
        match &stages[i] {
            RenderStage::ScalePad {
                content_width,
                content_height,
                target_width,
                target_height,
                offset_x,
                offset_y,
                color,
            } => match stages.get(i + 1) {
                Some(RenderStage::BlurredBackground {
                    target_width: bg_width,
                    target_height: bg_height,
                    blur_radius,
                    blur_passes,
                    anchor,
                    ..
                }) => {
                    if !chain.is_empty() || complex_head.is_some() {
                        return Err(MediaError::internal("background stage must be part of the base stage"));
                    }
                    complex_head = Some(format!(
                        "[0:v]split=2[bg][fg];[bg]{}[bgb];[fg]scale={}:{}[fgs];[bgb][fgs]overlay={}:{}",
                        filter_blur_background(*bg_width, *bg_height, *anchor, *blur_radius, *blur_passes),
                        content_width,
                        content_height,
                        offset_x,
                        offset_y,
                    ));
                    i += 1;
                }
                _ => chain.push(filter_scale_pad(
                    *content_width,
                    *content_height,
                    *target_width,
                    *target_height,
                    *offset_x,
                    *offset_y,
                    color,
                )),
            },
            RenderStage::CropScale {
                window,
                target_width,
                target_height,
            } => chain.push(filter_crop_scale(
                window.width,
                window.height,
                window.x,
                window.y,
                *target_width,
                *target_height,
            )),
            RenderStage::BlurredBackground { .. } => {
                return Err(MediaError::internal("background stage without a preceding scale+pad stage"));
            }
            RenderStage::Enhance {
                contrast,
                brightness,
                saturation,
                sharpen_size,
                sharpen_amount,
            } => chain.push(filter_enhance(
                *contrast,
                *brightness,
                *saturation,
                *sharpen_size,
                *sharpen_amount,
            )),
        }
        i += 1;
    }

    chain.push("setsar=1".to_string());

    Ok(match complex_head {
        Some(head) => FilterGraph::Complex(format!("{},{}[{}]", head, chain.join(","), VIDEO_OUT_LABEL)),
        None => FilterGraph::Simple(chain.join(",")),
    })
}
