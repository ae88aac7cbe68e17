use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Backends treat the frame as read-only input. They return raw detections in
/// the frame's own pixel coordinates; scaling from the model's input size back
/// to the frame is the backend's job.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// The returned batches are consumed in order; a backend that processes a
    /// single image per call returns exactly one batch.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>>;

    /// Optional warm-up hook, run once after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
