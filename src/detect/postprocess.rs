//! YOLOv8-style output decoding.
//!
//! The detection head emits one tensor of shape `[1, 4 + classes, anchors]`
//! (or its transpose `[1, anchors, 4 + classes]`). Each anchor carries a
//! center-format box in model-input pixels followed by one score per class.
//! Decoding picks the best class per anchor, drops anchors under the score
//! floor, maps boxes back to frame pixels and runs per-class NMS.

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;

/// Score floor applied before NMS. Rendering applies its own, stricter threshold.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
/// IoU above which a lower-scored box of the same class is suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
/// Upper bound on detections kept per frame.
pub const MAX_DETECTIONS: usize = 300;

/// Parameters for decoding one output tensor.
#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    pub num_classes: usize,
    pub score_threshold: f32,
    pub iou_threshold: f32,
    /// Multiplier from model-input x to frame x.
    pub scale_x: f32,
    /// Multiplier from model-input y to frame y.
    pub scale_y: f32,
}

impl DecodeParams {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Scale boxes from a `model_w` x `model_h` input back to a `frame_w` x `frame_h` frame.
    pub fn with_scale(mut self, model_w: u32, model_h: u32, frame_w: u32, frame_h: u32) -> Self {
        self.scale_x = frame_w as f32 / model_w.max(1) as f32;
        self.scale_y = frame_h as f32 / model_h.max(1) as f32;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// `[1, 4 + classes, anchors]`
    ChannelsFirst { anchors: usize },
    /// `[1, anchors, 4 + classes]`
    ChannelsLast { anchors: usize },
}

fn layout(shape: &[usize], channels: usize) -> Result<Layout> {
    match shape {
        [1, c, a] if *c == channels => Ok(Layout::ChannelsFirst { anchors: *a }),
        [1, a, c] if *c == channels => Ok(Layout::ChannelsLast { anchors: *a }),
        _ => Err(anyhow!(
            "unexpected detector output shape {:?} for {} channels",
            shape,
            channels
        )),
    }
}

/// Decode a flat output tensor in logical (row-major) order.
pub fn decode(data: &[f32], shape: &[usize], params: &DecodeParams) -> Result<Vec<Detection>> {
    let channels = params.num_classes + 4;
    let layout = layout(shape, channels)?;
    let expected: usize = shape.iter().product();
    if data.len() != expected {
        return Err(anyhow!(
            "detector output length mismatch: expected {}, got {}",
            expected,
            data.len()
        ));
    }

    let anchors = match layout {
        Layout::ChannelsFirst { anchors } | Layout::ChannelsLast { anchors } => anchors,
    };
    let at = |a: usize, c: usize| -> f32 {
        match layout {
            Layout::ChannelsFirst { anchors } => data[c * anchors + a],
            Layout::ChannelsLast { .. } => data[a * channels + c],
        }
    };

    let mut candidates = Vec::new();
    for a in 0..anchors {
        let (mut best_class, mut best_score) = (0usize, f32::NEG_INFINITY);
        for class in 0..params.num_classes {
            let score = at(a, 4 + class);
            if score > best_score {
                best_class = class;
                best_score = score;
            }
        }
        if !best_score.is_finite() || best_score < params.score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(a, 0), at(a, 1), at(a, 2), at(a, 3));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }
        candidates.push(Detection::new(
            [
                (cx - w / 2.0) * params.scale_x,
                (cy - h / 2.0) * params.scale_y,
                (cx + w / 2.0) * params.scale_x,
                (cy + h / 2.0) * params.scale_y,
            ],
            best_class as i64,
            best_score.min(1.0),
        ));
    }

    Ok(non_max_suppression(candidates, params.iou_threshold))
}

/// Per-class NMS. Output is sorted by descending confidence and capped at `MAX_DETECTIONS`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= MAX_DETECTIONS {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_index == candidate.class_index && iou(kept, &candidate) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over union of two corner-format boxes.
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }
    inter / union
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a channels-first tensor from per-anchor rows `[cx, cy, w, h, scores...]`.
    fn channels_first(rows: &[Vec<f32>]) -> (Vec<f32>, Vec<usize>) {
        let channels = rows[0].len();
        let anchors = rows.len();
        let mut data = vec![0.0; channels * anchors];
        for (a, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                data[c * anchors + a] = *value;
            }
        }
        (data, vec![1, channels, anchors])
    }

    #[test]
    fn decode_picks_best_class_and_converts_to_corners() {
        let (data, shape) = channels_first(&[
            vec![50.0, 40.0, 20.0, 10.0, 0.1, 0.0, 0.9],
            vec![10.0, 10.0, 4.0, 4.0, 0.1, 0.2, 0.05],
        ]);
        let detections = decode(&data, &shape, &DecodeParams::new(3)).unwrap();

        assert_eq!(detections.len(), 1);
        let d = detections[0];
        assert_eq!(d.class_index, 2);
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (40.0, 35.0, 60.0, 45.0));
        assert!((d.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn decode_accepts_channels_last_and_scales_boxes() {
        let data = vec![32.0, 32.0, 16.0, 16.0, 0.8];
        let params = DecodeParams::new(1).with_scale(64, 64, 128, 32);
        let detections = decode(&data, &[1, 1, 5], &params).unwrap();

        assert_eq!(detections.len(), 1);
        let d = detections[0];
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (48.0, 12.0, 80.0, 20.0));
    }

    #[test]
    fn decode_rejects_unexpected_shape() {
        let data = vec![0.0; 12];
        assert!(decode(&data, &[1, 3, 4], &DecodeParams::new(10)).is_err());
        assert!(decode(&data, &[1, 6, 3], &DecodeParams::new(2)).is_err());
    }

    #[test]
    fn nms_only_suppresses_within_a_class() {
        let strong = Detection::new([0.0, 0.0, 10.0, 10.0], 0, 0.9);
        let overlapping = Detection::new([1.0, 1.0, 10.0, 10.0], 0, 0.8);
        let other_class = Detection::new([1.0, 1.0, 10.0, 10.0], 1, 0.7);
        let kept = non_max_suppression(vec![overlapping, other_class, strong], 0.5);

        assert_eq!(kept, vec![strong, other_class]);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Detection::new([0.0, 0.0, 1.0, 1.0], 0, 0.5);
        let b = Detection::new([2.0, 2.0, 3.0, 3.0], 0, 0.5);
        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }
}
