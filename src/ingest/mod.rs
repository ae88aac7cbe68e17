//! Frame ingestion sources.
//!
//! This module provides the two sources a detection run can pull from:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Live cameras through V4L2 (feature: ingest-v4l2)
//! - Synthetic `stub://` sources of either kind (always available)
//!
//! `FrameSource` puts both behind one pull interface. Opening reports
//! `InvalidSourcePath` or `DeviceUnavailable`; a read failure after opening is
//! a `SourceFailure`. End of stream is `Ok(None)` for both kinds. Releasing is
//! idempotent and also happens on drop.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(any(feature = "ingest-v4l2", test))]
mod normalize;
mod synthetic;

use anyhow::Result;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use file::{FileConfig, FileSource, FileStats};

use crate::frame::Frame;
use crate::{SessionError, SessionErrorKind};

/// What a run should open: a video file or a camera.
#[derive(Clone, Debug)]
pub enum SourceHandle {
    File(FileConfig),
    Camera(CameraConfig),
}

impl SourceHandle {
    /// A local video file with default decoding settings.
    pub fn file(path: impl Into<String>) -> Self {
        Self::File(FileConfig::new(path))
    }

    /// Camera `index` with default capture settings.
    pub fn camera(index: u32) -> Self {
        Self::Camera(CameraConfig::for_index(index))
    }

    /// File path or device path, for logs and alerts.
    pub fn describe(&self) -> &str {
        match self {
            Self::File(config) => &config.path,
            Self::Camera(config) => &config.device,
        }
    }
}

enum SourceState {
    File(FileSource),
    Camera(CameraSource),
    Released,
}

/// An opened frame source, owned by exactly one run.
pub struct FrameSource {
    state: SourceState,
    identifier: String,
}

impl FrameSource {
    /// Open either kind of source.
    pub fn open(handle: SourceHandle) -> Result<Self> {
        match handle {
            SourceHandle::File(config) => Self::open_file(config),
            SourceHandle::Camera(config) => Self::open_camera(config),
        }
    }

    /// Open a local video file. Fails with `InvalidSourcePath` if the path is
    /// empty, remote, missing or not decodable.
    pub fn open_file(config: FileConfig) -> Result<Self> {
        let identifier = config.path.clone();
        let opened = FileSource::new(config).and_then(|mut source| {
            source.connect()?;
            Ok(source)
        });
        match opened {
            Ok(source) => Ok(Self {
                state: SourceState::File(source),
                identifier,
            }),
            Err(err) => Err(err.context(SessionError::new(
                SessionErrorKind::InvalidSourcePath,
                format!("cannot play '{}'", identifier),
            ))),
        }
    }

    /// Acquire a camera. Fails with `DeviceUnavailable` if the device cannot
    /// be opened or refuses to stream.
    pub fn open_camera(config: CameraConfig) -> Result<Self> {
        let identifier = config.device.clone();
        let opened = CameraSource::new(config).and_then(|mut source| {
            source.connect()?;
            Ok(source)
        });
        match opened {
            Ok(source) => Ok(Self {
                state: SourceState::Camera(source),
                identifier,
            }),
            Err(err) => Err(err.context(SessionError::new(
                SessionErrorKind::DeviceUnavailable,
                format!("cannot acquire camera {}", identifier),
            ))),
        }
    }

    /// Blocking read of the next frame; `None` at end of stream or after release.
    pub fn pull(&mut self) -> Result<Option<Frame>> {
        let pulled = match &mut self.state {
            SourceState::File(source) => source.next_frame(),
            SourceState::Camera(source) => source.next_frame(),
            SourceState::Released => return Ok(None),
        };
        pulled.map_err(|err| {
            err.context(SessionError::new(
                SessionErrorKind::SourceFailure,
                format!("failed to read from {}", self.identifier),
            ))
        })
    }

    /// Drop the underlying decoder or device. Safe to call repeatedly.
    pub fn release(&mut self) {
        if matches!(self.state, SourceState::Released) {
            return;
        }
        let stats = self.stats();
        self.state = SourceState::Released;
        log::info!(
            "FrameSource: released {} after {} frames",
            stats.source,
            stats.frames_captured
        );
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, SourceState::Released)
    }

    /// Frames captured so far; zero once released.
    pub fn stats(&self) -> SourceStats {
        let frames_captured = match &self.state {
            SourceState::File(source) => source.stats().frames_captured,
            SourceState::Camera(source) => source.stats().frames_captured,
            SourceState::Released => 0,
        };
        SourceStats {
            frames_captured,
            source: self.identifier.clone(),
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Statistics for an opened source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}
