//! PPE Detect
//!
//! Runs a personal-protective-equipment detector over a recorded video file or
//! a live camera and overlays the results frame by frame.
//!
//! # Architecture
//!
//! A run is a single blocking loop on the calling thread:
//!
//! 1. **Acquire**: open a `FrameSource` for a file or a camera.
//! 2. **Detect**: hand each frame to the `DetectionSession`'s detector backend.
//! 3. **Annotate**: floor and clamp boxes, round confidences up to the
//!    hundredth, keep those strictly above `CONFIDENCE_THRESHOLD`, and draw a
//!    colored outline plus a labelled badge.
//! 4. **Present**: show the frame on one display surface and poll for quit.
//! 5. **Release**: drop the source and close the surface, on every exit path.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames, resizing and the 800x600 canvas
//! - `font`: bitmap text used for labels
//! - `catalog`: class index to label mapping and compliance coloring
//! - `detect`: detector backends (tract ONNX, scripted stub) and YOLO decoding
//! - `ingest`: frame sources (local files, V4L2 cameras, synthetic)
//! - `annotate`: per-detection scoring and drawing
//! - `display`: display surfaces (OpenCV window, headless)
//! - `session`: the run loop and its cancellation token
//! - `config`, `ui`: startup configuration and terminal progress

pub mod annotate;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod display;
pub mod font;
pub mod frame;
pub mod ingest;
pub mod session;
pub mod ui;

pub use annotate::Annotation;
pub use catalog::{ClassCatalog, Compliance, PPE_CLASSES};
pub use config::AppConfig;
pub use detect::{Detection, DetectionResult, DetectorBackend};
pub use display::{DisplaySurface, Key};
pub use frame::Frame;
pub use ingest::{FrameSource, SourceHandle};
pub use session::{CancellationToken, DetectionSession, RunConfig, RunSummary, StopReason};

/// Detections must score strictly above this after rounding up to be drawn.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// User-facing failure categories of a detection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionErrorKind {
    /// The chosen file is missing, remote, or not a decodable video.
    InvalidSourcePath,
    /// The camera could not be acquired.
    DeviceUnavailable,
    /// The detector reported a class the catalog does not know.
    ClassIndexOutOfRange,
    /// Reading from an opened source failed mid-stream.
    SourceFailure,
    /// The detector backend failed on a frame.
    DetectorFailure,
}

impl SessionErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidSourcePath => "INVALID_SOURCE_PATH",
            Self::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            Self::ClassIndexOutOfRange => "CLASS_INDEX_OUT_OF_RANGE",
            Self::SourceFailure => "SOURCE_FAILURE",
            Self::DetectorFailure => "DETECTOR_FAILURE",
        }
    }
}

/// Typed error attached to `anyhow` chains; recover it with
/// `err.downcast_ref::<SessionError>()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for SessionError {}
