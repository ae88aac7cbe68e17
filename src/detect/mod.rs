//! Detector backends.
//!
//! A backend consumes one frame and yields a sequence of result batches, each
//! holding the raw detections (pixel-space box, class index, confidence) for
//! that frame. Filtering, labelling and drawing happen downstream in the
//! session; backends never touch the frame's pixels.

mod backend;
mod backends;
mod loader;
pub mod postprocess;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use loader::load_backend;
pub use result::{Detection, DetectionResult};
