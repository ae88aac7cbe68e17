//! Per-detection scoring and overlay drawing.
//!
//! Boxes are floored to whole pixels and clamped into the frame, confidences
//! are rounded up to the hundredth, and each rendered detection gets a 2 px
//! outline plus a filled badge reading `"<label> <confidence>"` in white.

use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::catalog::Compliance;
use crate::detect::Detection;
use crate::font::BitmapFont;
use crate::frame::{Color, Frame};

pub const RED: Color = Rgb([255, 0, 0]);
pub const GREEN: Color = Rgb([0, 255, 0]);
pub const BLUE: Color = Rgb([0, 0, 255]);
pub const WHITE: Color = Rgb([255, 255, 255]);

/// Outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;
/// Distance between the top of the box and the badge baseline.
pub const LABEL_OFFSET: i32 = 10;
/// Scale applied to the 5x7 label font.
pub const LABEL_FONT: BitmapFont = BitmapFont::new(3);

/// Round a raw confidence up to the next hundredth.
///
/// Computed in `f32`, the precision detectors report in.
pub fn round_up_confidence(raw: f32) -> f32 {
    (raw * 100.0).ceil() / 100.0
}

/// Whole values keep one decimal (`1.0`); everything else prints in shortest form (`0.87`).
pub fn format_confidence(confidence: f32) -> String {
    if confidence.fract() == 0.0 {
        format!("{:.1}", confidence)
    } else {
        format!("{}", confidence)
    }
}

pub fn color_for(compliance: Compliance) -> Color {
    match compliance {
        Compliance::Violation => RED,
        Compliance::Compliant => GREEN,
        Compliance::Neutral => BLUE,
    }
}

/// Integer box with `0 <= x1 <= x2 < width` and `0 <= y1 <= y2 < height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Floor a detector box and clamp it into a `width` x `height` frame.
pub fn clamp_box(detection: &Detection, width: u32, height: u32) -> PixelBox {
    let max_x = (width.max(1) - 1) as i32;
    let max_y = (height.max(1) - 1) as i32;
    let x1 = (detection.x1.floor() as i32).clamp(0, max_x);
    let y1 = (detection.y1.floor() as i32).clamp(0, max_y);
    PixelBox {
        x1,
        y1,
        x2: (detection.x2.floor() as i32).clamp(x1, max_x),
        y2: (detection.y2.floor() as i32).clamp(y1, max_y),
    }
}

/// A detection ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub bbox: PixelBox,
    pub class_index: i64,
    pub label: &'static str,
    /// Rounded-up confidence.
    pub confidence: f32,
    pub color: Color,
}

impl Annotation {
    /// Score one detection against a frame of the given size.
    pub fn new(detection: &Detection, label: &'static str, width: u32, height: u32) -> Self {
        Self {
            bbox: clamp_box(detection, width, height),
            class_index: detection.class_index,
            label,
            confidence: round_up_confidence(detection.confidence),
            color: color_for(Compliance::of(label)),
        }
    }

    /// Badge text, e.g. `"NO-Hardhat 0.87"`.
    pub fn caption(&self) -> String {
        format!("{} {}", self.label, format_confidence(self.confidence))
    }

    /// Whether the rounded confidence clears `threshold` (strictly).
    pub fn passes(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }

    /// Bottom-left corner of the badge text.
    pub fn caption_anchor(&self) -> (i32, i32) {
        (self.bbox.x1, (self.bbox.y1 - LABEL_OFFSET).max(0))
    }
}

/// Outline `bbox` with `BOX_THICKNESS` nested one-pixel rings, the innermost on
/// the box edge itself and the rest growing outward.
pub fn outline_box(frame: &mut Frame, bbox: PixelBox, color: Color) {
    let width = (bbox.x2 - bbox.x1 + 1) as u32;
    let height = (bbox.y2 - bbox.y1 + 1) as u32;
    for ring in 0..BOX_THICKNESS {
        let rect = Rect::at(bbox.x1 - ring as i32, bbox.y1 - ring as i32)
            .of_size(width + 2 * ring, height + 2 * ring);
        draw_hollow_rect_mut(frame.image_mut(), rect, color);
    }
}

/// Draw the outline, badge background and caption for `annotation`.
pub fn draw_annotation(frame: &mut Frame, annotation: &Annotation, font: &BitmapFont) {
    outline_box(frame, annotation.bbox, annotation.color);

    let caption = annotation.caption();
    let (text_w, text_h) = font.text_size(&caption);
    let (tx, ty) = annotation.caption_anchor();
    let badge = Rect::at(tx, ty - text_h as i32).of_size(text_w + 1, text_h + 1);
    draw_filled_rect_mut(frame.image_mut(), badge, annotation.color);
    font.draw(frame, &caption, (tx, ty), WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Color = Rgb([0, 0, 0]);

    #[test]
    fn rounding_goes_up_to_the_hundredth() {
        assert_eq!(round_up_confidence(0.5013), 0.51);
        assert_eq!(round_up_confidence(0.5), 0.5);
        assert_eq!(round_up_confidence(0.87), 0.87);
        assert_eq!(round_up_confidence(1.0), 1.0);
        for raw in [0.0_f32, 0.123, 0.4999, 0.731, 0.99, 0.999] {
            let rounded = round_up_confidence(raw);
            assert!(rounded >= raw, "{} rounded down to {}", raw, rounded);
            let hundredths = rounded * 100.0;
            assert!((hundredths - hundredths.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn confidence_formatting() {
        assert_eq!(format_confidence(0.87), "0.87");
        assert_eq!(format_confidence(0.5), "0.5");
        assert_eq!(format_confidence(1.0), "1.0");
    }

    #[test]
    fn clamped_boxes_stay_ordered_and_inside() {
        let cases = [
            Detection::new([-20.7, -3.2, 50.9, 40.1], 0, 0.9),
            Detection::new([90.0, 70.0, 400.0, 300.0], 0, 0.9),
            Detection::new([60.0, 50.0, 10.0, 5.0], 0, 0.9),
            Detection::new([-10.0, -10.0, -5.0, -5.0], 0, 0.9),
        ];
        for detection in cases {
            let b = clamp_box(&detection, 100, 80);
            assert!(0 <= b.x1 && b.x1 <= b.x2 && b.x2 < 100, "{:?}", b);
            assert!(0 <= b.y1 && b.y1 <= b.y2 && b.y2 < 80, "{:?}", b);
        }
        let b = clamp_box(&cases[0], 100, 80);
        assert_eq!(b, PixelBox { x1: 0, y1: 0, x2: 50, y2: 40 });
    }

    #[test]
    fn violation_is_red_and_rendered() {
        let detection = Detection::new([10.0, 40.0, 60.0, 90.0], 2, 0.87);
        let annotation = Annotation::new(&detection, "NO-Hardhat", 200, 120);
        assert_eq!(annotation.color, RED);
        assert!(annotation.passes(0.5));
        assert_eq!(annotation.caption(), "NO-Hardhat 0.87");
    }

    #[test]
    fn exact_threshold_is_not_rendered() {
        let detection = Detection::new([0.0, 0.0, 10.0, 10.0], 0, 0.5);
        let annotation = Annotation::new(&detection, "Hardhat", 20, 20);
        assert_eq!(annotation.color, GREEN);
        assert!(!annotation.passes(0.5));
    }

    #[test]
    fn person_is_blue() {
        let detection = Detection::new([0.0, 0.0, 10.0, 10.0], 5, 0.9);
        assert_eq!(Annotation::new(&detection, "Person", 20, 20).color, BLUE);
    }

    #[test]
    fn outline_is_two_pixels_wide_and_hollow() {
        let mut frame = Frame::filled(20, 20, BLACK);
        outline_box(&mut frame, PixelBox { x1: 5, y1: 5, x2: 14, y2: 14 }, RED);

        for (x, y) in [(5, 5), (4, 4), (4, 10), (5, 10), (14, 10), (15, 10), (10, 14), (10, 15)] {
            assert_eq!(frame.pixel(x, y), Some(RED), "({}, {})", x, y);
        }
        assert_eq!(frame.pixel(6, 10), Some(BLACK));
        assert_eq!(frame.pixel(10, 10), Some(BLACK));
        assert_eq!(frame.pixel(3, 10), Some(BLACK));
        assert_eq!(frame.pixel(16, 10), Some(BLACK));
    }

    #[test]
    fn outline_on_frame_edge_is_clipped() {
        let mut frame = Frame::filled(10, 10, BLACK);
        outline_box(&mut frame, PixelBox { x1: 0, y1: 0, x2: 9, y2: 9 }, GREEN);

        assert_eq!(frame.pixel(0, 0), Some(GREEN));
        assert_eq!(frame.pixel(9, 5), Some(GREEN));
        assert_eq!(frame.pixel(5, 9), Some(GREEN));
        assert_eq!(frame.pixel(5, 5), Some(BLACK));
    }

    #[test]
    fn drawing_outlines_box_and_places_badge_above() {
        let mut frame = Frame::filled(320, 120, BLACK);
        let detection = Detection::new([10.0, 60.0, 80.0, 110.0], 2, 0.87);
        let annotation = Annotation::new(&detection, "NO-Hardhat", 320, 120);
        draw_annotation(&mut frame, &annotation, &LABEL_FONT);

        // outline on all four edges, interior untouched
        assert_eq!(frame.pixel(45, 60), Some(RED));
        assert_eq!(frame.pixel(45, 110), Some(RED));
        assert_eq!(frame.pixel(10, 85), Some(RED));
        assert_eq!(frame.pixel(80, 85), Some(RED));
        assert_eq!(frame.pixel(45, 85), Some(BLACK));

        // badge baseline sits 10 px above the box; white text somewhere on it
        let (tx, ty) = annotation.caption_anchor();
        assert_eq!((tx, ty), (10, 50));
        let (text_w, text_h) = LABEL_FONT.text_size(&annotation.caption());
        let mut saw_white = false;
        for y in (ty - text_h as i32)..=ty {
            for x in tx..=(tx + text_w as i32) {
                let px = frame.pixel(x as u32, y as u32);
                assert!(px == Some(RED) || px == Some(WHITE), "({}, {}) = {:?}", x, y, px);
                saw_white |= px == Some(WHITE);
            }
        }
        assert!(saw_white);
    }

    #[test]
    fn badge_at_top_edge_is_clipped() {
        let mut frame = Frame::filled(100, 60, BLACK);
        let detection = Detection::new([5.0, 2.0, 40.0, 30.0], 5, 0.9);
        let annotation = Annotation::new(&detection, "Person", 100, 60);
        assert_eq!(annotation.caption_anchor(), (5, 0));
        draw_annotation(&mut frame, &annotation, &LABEL_FONT);
        assert_eq!(frame.pixel(5, 2), Some(BLUE));
    }
}
