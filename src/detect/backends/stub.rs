use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

/// Scripted backend for testing and `stub://` models.
///
/// Replays a fixed script of per-frame batches. Once the script is exhausted the
/// last entry repeats; an empty script yields one empty batch per frame.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    script: Vec<Vec<DetectionResult>>,
    calls: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the same detections, as one batch, for every frame.
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self {
            script: vec![vec![DetectionResult::new(detections)]],
            calls: 0,
        }
    }

    /// Return `script[n]` for the n-th frame.
    pub fn with_script(script: Vec<Vec<DetectionResult>>) -> Self {
        Self { script, calls: 0 }
    }

    /// Number of frames this backend has been asked to process.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectionResult>> {
        let batches = match self.script.len() {
            0 => vec![DetectionResult::default()],
            len => self.script[self.calls.min(len - 1)].clone(),
        };
        self.calls += 1;
        Ok(batches)
    }
}
