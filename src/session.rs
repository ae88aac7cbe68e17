//! The detection run loop.
//!
//! `DetectionSession::run` opens a source, then for every frame: optionally
//! resize to the 800x600 canvas, detect, annotate, present, poll for quit.
//! The source is released and the display closed on every exit path before
//! `run` returns.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::annotate::{draw_annotation, Annotation, LABEL_FONT};
use crate::catalog::{ClassCatalog, Lookup};
use crate::detect::DetectorBackend;
use crate::display::DisplaySurface;
use crate::font::BitmapFont;
use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceHandle};
use crate::{SessionError, SessionErrorKind, CONFIDENCE_THRESHOLD};

/// Shared stop flag, checked once per frame.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Re-arm the token before the next run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// The per-action differences between file playback and live detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Resize every frame to the fixed canvas before detection.
    pub resize_to_canvas: bool,
    /// Alert shown when the source cannot be opened.
    pub error_message: String,
}

impl RunConfig {
    /// Recorded video: frames keep their native size.
    pub fn file() -> Self {
        Self {
            resize_to_canvas: false,
            error_message: "Please select a valid video file.".to_string(),
        }
    }

    /// Live camera: frames are resized to 800x600.
    pub fn live() -> Self {
        Self {
            resize_to_canvas: true,
            error_message: "Failed to open the camera.".to_string(),
        }
    }

    /// Text to show the user for a failed run.
    pub fn alert_for(&self, err: &anyhow::Error) -> String {
        match err.downcast_ref::<SessionError>().map(|e| e.kind) {
            Some(SessionErrorKind::InvalidSourcePath | SessionErrorKind::DeviceUnavailable) => {
                self.error_message.clone()
            }
            _ => format!("{:#}", err),
        }
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    /// `q` or Escape on the display.
    QuitRequested,
    /// The token was tripped from outside the loop (Ctrl-C).
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub stop: StopReason,
}

/// Detector, catalog and threshold for a sequence of runs.
pub struct DetectionSession {
    detector: Box<dyn DetectorBackend>,
    catalog: ClassCatalog,
    threshold: f32,
    font: BitmapFont,
}

impl DetectionSession {
    /// PPE catalog with the fixed confidence threshold.
    pub fn new(detector: Box<dyn DetectorBackend>) -> Self {
        Self::with_catalog(detector, ClassCatalog::ppe(), CONFIDENCE_THRESHOLD)
    }

    pub fn with_catalog(
        detector: Box<dyn DetectorBackend>,
        catalog: ClassCatalog,
        threshold: f32,
    ) -> Self {
        Self {
            detector,
            catalog,
            threshold,
            font: LABEL_FONT,
        }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Detect on `frame` and draw every detection above the threshold onto it.
    ///
    /// Unknown class indices are drawn as `"Unknown"` and never abort the frame.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<Vec<Annotation>> {
        let batches = self.detector.detect(frame).map_err(|err| {
            err.context(SessionError::new(
                SessionErrorKind::DetectorFailure,
                format!("{} backend failed", self.detector.name()),
            ))
        })?;

        let (width, height) = (frame.width(), frame.height());
        let mut drawn = Vec::new();
        for detection in batches.iter().flat_map(|batch| batch.detections.iter()) {
            log::debug!("Detected class index: {}", detection.class_index);
            let lookup = self.catalog.lookup(detection.class_index);
            if let Lookup::OutOfRange(index) = lookup {
                log::warn!(
                    "{}",
                    SessionError::new(
                        SessionErrorKind::ClassIndexOutOfRange,
                        format!(
                            "class index {} outside catalog of {}",
                            index,
                            self.catalog.len()
                        ),
                    )
                );
            }

            let annotation = Annotation::new(detection, lookup.label(), width, height);
            if annotation.passes(self.threshold) {
                draw_annotation(frame, &annotation, &self.font);
                drawn.push(annotation);
            }
        }
        Ok(drawn)
    }

    /// Run one blocking acquire, process, present loop against `handle`.
    ///
    /// An open failure returns before any frame is pulled.
    pub fn run(
        &mut self,
        handle: SourceHandle,
        config: &RunConfig,
        display: &mut dyn DisplaySurface,
        token: &CancellationToken,
    ) -> Result<RunSummary> {
        let mut source = match FrameSource::open(handle) {
            Ok(source) => source,
            Err(err) => {
                display.close();
                return Err(err);
            }
        };

        let outcome = self.drive(&mut source, config, display, token);
        source.release();
        display.close();

        match &outcome {
            Ok(summary) => log::info!(
                "run finished: {} frames processed ({:?})",
                summary.frames_processed,
                summary.stop
            ),
            Err(err) => log::warn!("run aborted: {:#}", err),
        }
        outcome
    }

    fn drive(
        &mut self,
        source: &mut FrameSource,
        config: &RunConfig,
        display: &mut dyn DisplaySurface,
        token: &CancellationToken,
    ) -> Result<RunSummary> {
        let mut frames_processed = 0;
        let mut quit_pressed = false;

        loop {
            if token.is_cancelled() {
                let stop = if quit_pressed {
                    StopReason::QuitRequested
                } else {
                    StopReason::Cancelled
                };
                return Ok(RunSummary {
                    frames_processed,
                    stop,
                });
            }

            let Some(mut frame) = source.pull()? else {
                return Ok(RunSummary {
                    frames_processed,
                    stop: StopReason::EndOfStream,
                });
            };
            if config.resize_to_canvas {
                frame = frame.resized_to_canvas();
            }

            self.process_frame(&mut frame)?;
            frames_processed += 1;
            display.present(&frame)?;

            if display.poll_key()?.is_some_and(|key| key.is_quit()) {
                quit_pressed = true;
                token.cancel();
            }
        }
    }
}
