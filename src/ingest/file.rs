//! Local video file source.
//!
//! `FileSource` decodes frames from a local video file in-memory. Only plain
//! filesystem paths are accepted; URL schemes are rejected up front, except for
//! `stub://` locators which select the synthetic generator used by tests.

use anyhow::{anyhow, Result};
use std::path::Path;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{SyntheticSource, STUB_SCHEME};
use crate::frame::Frame;

/// Synthetic file clips default to this many frames when `frames` is not given.
const SYNTHETIC_CLIP_FRAMES: u64 = 30;
const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/srv/footage/site-a.mp4").
    pub path: String,
    /// Pacing hint in frames per second; `0` decodes as fast as possible.
    pub target_fps: u32,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            target_fps: 0,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        validate_local_path(&config.path)?;
        if config.path.starts_with(STUB_SCHEME) {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "decoding {} requires the ingest-file-ffmpeg feature",
                    config.path
                ))
            }
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Decode the next frame; `None` at end of file.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    generator: SyntheticSource,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let generator = SyntheticSource::parse(
            &config.path,
            SYNTHETIC_WIDTH,
            SYNTHETIC_HEIGHT,
            Some(SYNTHETIC_CLIP_FRAMES),
        )?;
        Ok(Self { config, generator })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (synthetic clip '{}')",
            self.config.path,
            self.generator.name()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.generator.next_frame()
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.generator.frame_count(),
            path: self.config.path.clone(),
        }
    }
}

fn validate_local_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(anyhow!("no video file selected"));
    }
    if path.starts_with(STUB_SCHEME) {
        return Ok(());
    }
    if path.contains("://") {
        return Err(anyhow!(
            "file playback only supports local paths (no URL schemes): {}",
            path
        ));
    }
    if !Path::new(path).is_file() {
        return Err(anyhow!("video file {} does not exist", path));
    }
    Ok(())
}
