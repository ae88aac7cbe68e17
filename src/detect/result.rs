/// One batch of detections for a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// A single predicted object, as produced by the model.
///
/// Coordinates are pixel positions in the frame that was passed to the
/// backend and may fall outside it; the session clamps them before drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Class index into the catalog. Not guaranteed to be in range.
    pub class_index: i64,
    /// Score in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: [f32; 4], class_index: i64, confidence: f32) -> Self {
        let [x1, y1, x2, y2] = bbox;
        Self {
            x1,
            y1,
            x2,
            y2,
            class_index,
            confidence,
        }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}
