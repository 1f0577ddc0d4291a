//! ROI aggregation into a single protect region.

use std::cmp::Ordering;

use adapt_models::{BoundingBox, RoiBox, SourceGeometry};

use super::config::ProtectConfig;

/// Aggregated region the FILL crop tries to keep in frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectRegion {
    /// Bounding union of the anchor boxes, in source pixels
    pub bounds: BoundingBox,
    /// Weighted mean of qualifying box centers
    pub centroid: (f64, f64),
    /// Number of boxes that survived filtering
    pub box_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Weighted {
    bbox: BoundingBox,
    weight: f64,
}

fn total_key(a: &Weighted, b: &Weighted) -> Ordering {
    a.bbox
        .x
        .total_cmp(&b.bbox.x)
        .then(a.bbox.y.total_cmp(&b.bbox.y))
        .then(a.bbox.width.total_cmp(&b.bbox.width))
        .then(a.bbox.height.total_cmp(&b.bbox.height))
        .then(a.weight.total_cmp(&b.weight))
}

/// Aggregate ROI boxes into a protect region.
///
/// Boxes are clipped to the frame; boxes below `min_confidence`, non-finite
/// or fully outside the frame are dropped. Returns `None` when nothing
/// qualifies. The result does not depend on input order.
pub fn aggregate(boxes: &[RoiBox], source: SourceGeometry, config: &ProtectConfig) -> Option<ProtectRegion> {
    let (fw, fh) = (source.width as f64, source.height as f64);

    let mut qualifying: Vec<Weighted> = boxes
        .iter()
        .filter(|roi| roi.confidence.is_finite() && roi.confidence >= config.min_confidence)
        .filter_map(|roi| {
            let bbox = roi.bbox.clip_to(fw, fh)?;
            let weight = roi.confidence.min(1.0) * config.category_weight(roi.category);
            (weight > 0.0).then_some(Weighted { bbox, weight })
        })
        .collect();

    if qualifying.is_empty() {
        return None;
    }

    // Summation order is fixed so floating point results are reproducible
    qualifying.sort_by(total_key);

    let anchors: Vec<BoundingBox> = qualifying
        .iter()
        .filter(|w| w.weight >= config.anchor_weight)
        .map(|w| w.bbox)
        .collect();
    let bounds = if anchors.is_empty() {
        let all: Vec<BoundingBox> = qualifying.iter().map(|w| w.bbox).collect();
        BoundingBox::union(&all)?
    } else {
        BoundingBox::union(&anchors)?
    };

    let total_weight: f64 = qualifying.iter().map(|w| w.weight).sum();
    let cx = qualifying.iter().map(|w| w.weight * w.bbox.cx()).sum::<f64>() / total_weight;
    let cy = qualifying.iter().map(|w| w.weight * w.bbox.cy()).sum::<f64>() / total_weight;

    Some(ProtectRegion {
        bounds,
        centroid: (cx, cy),
        box_count: qualifying.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapt_models::RoiCategory;

    fn roi(x: f64, y: f64, w: f64, h: f64, category: RoiCategory, confidence: f64) -> RoiBox {
        RoiBox::new(0.0, BoundingBox::new(x, y, w, h), category, confidence)
    }

    fn source() -> SourceGeometry {
        SourceGeometry::new(1920, 1080)
    }

    #[test]
    fn test_empty_and_low_confidence() {
        let config = ProtectConfig::default();
        assert!(aggregate(&[], source(), &config).is_none());

        let weak = [roi(100.0, 100.0, 50.0, 50.0, RoiCategory::Logo, 0.2)];
        assert!(aggregate(&weak, source(), &config).is_none());
    }

    #[test]
    fn test_boxes_outside_frame_are_dropped() {
        let config = ProtectConfig::default();
        let outside = [roi(2500.0, 100.0, 50.0, 50.0, RoiCategory::Logo, 0.9)];
        assert!(aggregate(&outside, source(), &config).is_none());

        let partial = [roi(1900.0, 100.0, 100.0, 50.0, RoiCategory::Logo, 0.9)];
        let region = aggregate(&partial, source(), &config).unwrap();
        assert_eq!(region.bounds.x2(), 1920.0);
    }

    #[test]
    fn test_weak_generic_does_not_widen_bounds() {
        let config = ProtectConfig::default();
        let boxes = [
            roi(100.0, 100.0, 100.0, 100.0, RoiCategory::Logo, 0.9),
            // 0.6 * 0.5 = 0.3, below the anchor weight
            roi(1500.0, 800.0, 100.0, 100.0, RoiCategory::Generic, 0.6),
        ];
        let region = aggregate(&boxes, source(), &config).unwrap();
        assert_eq!(region.bounds, BoundingBox::new(100.0, 100.0, 100.0, 100.0));
        assert_eq!(region.box_count, 2);
        // Centroid is still pulled toward the generic box
        assert!(region.centroid.0 > 150.0);
    }

    #[test]
    fn test_all_weak_falls_back_to_full_union() {
        let config = ProtectConfig::default();
        let boxes = [
            roi(100.0, 100.0, 100.0, 100.0, RoiCategory::Generic, 0.6),
            roi(500.0, 300.0, 100.0, 100.0, RoiCategory::Generic, 0.7),
        ];
        let region = aggregate(&boxes, source(), &config).unwrap();
        assert_eq!(region.bounds.x, 100.0);
        assert_eq!(region.bounds.x2(), 600.0);
    }

    #[test]
    fn test_order_independent() {
        let config = ProtectConfig::default();
        let mut boxes = vec![
            roi(100.0, 120.0, 80.0, 40.0, RoiCategory::Text, 0.81),
            roi(900.0, 500.0, 200.0, 200.0, RoiCategory::Face, 0.93),
            roi(300.0, 700.0, 60.0, 60.0, RoiCategory::Generic, 0.77),
            roi(1400.0, 50.0, 300.0, 90.0, RoiCategory::Logo, 0.55),
        ];
        let forward = aggregate(&boxes, source(), &config).unwrap();
        boxes.reverse();
        let backward = aggregate(&boxes, source(), &config).unwrap();
        boxes.swap(0, 2);
        let shuffled = aggregate(&boxes, source(), &config).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }
}
