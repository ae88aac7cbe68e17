//! Live camera frame source.
//!
//! `CameraSource` captures frames from a local V4L2 device node. Camera index
//! `N` resolves to `/dev/videoN` unless the configuration names a device path.
//! Whatever pixel format the driver negotiates (RGB3, YUYV, NV12 or MJPG) is
//! normalized to RGB24 before the frame leaves this module.
//!
//! `stub://` device paths select the synthetic generator, which is unbounded
//! unless `frames=N` is given.

use anyhow::Result;
#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;

#[cfg(feature = "ingest-v4l2")]
use super::normalize::{normalize_to_rgb, PixelFormat};
use super::synthetic::{SyntheticSource, STUB_SCHEME};
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0").
    pub device: String,
    /// Requested frame rate; `0` leaves the driver default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl CameraConfig {
    /// Configuration for camera `index` with default capture settings.
    pub fn for_index(index: u32) -> Self {
        Self {
            device: device_path(index),
            ..Self::default()
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: device_path(0),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Device node for camera `index`.
pub fn device_path(index: u32) -> String {
    format!("/dev/video{}", index)
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with(STUB_SCHEME) {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCameraSource::new(config)),
                })
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                anyhow::bail!(
                    "capturing from {} requires the ingest-v4l2 feature",
                    config.device
                )
            }
        }
    }

    /// Acquire the device and start streaming.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Capture the next frame. Devices never end on their own; `None` only
    /// comes from bounded synthetic streams.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame().map(Some),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    generator: SyntheticSource,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let generator = SyntheticSource::parse(&config.device, config.width, config.height, None)?;
        Ok(Self { config, generator })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.generator.next_frame()
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.generator.frame_count(),
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// V4L2 device source
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceCameraSource {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            active_format: PixelFormat::Yuyv,
            config,
            state: None,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        self.active_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow::anyhow!(
                "camera {} negotiated unsupported pixel format {}",
                self.config.device,
                String::from_utf8_lossy(&format.fourcc.repr)
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.active_format
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera device not connected")?;
        let pixels = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture camera frame"))?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            Ok(buf[..used].to_vec())
        })?;

        let rgb = normalize_to_rgb(
            &pixels,
            self.active_width,
            self.active_height,
            self.active_format,
        )?;

        self.frame_count += 1;
        Frame::from_rgb(rgb, self.active_width, self.active_height)
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn stub_config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            target_fps: 30,
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn index_resolves_to_device_node() {
        assert_eq!(CameraConfig::for_index(0).device, "/dev/video0");
        assert_eq!(CameraConfig::for_index(3).device, "/dev/video3");
    }

    #[test]
    fn synthetic_camera_uses_configured_size() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://cam"))?;
        source.connect()?;
        let frame = source.next_frame()?.ok_or_else(|| anyhow!("expected a frame"))?;
        assert_eq!((frame.width(), frame.height()), (320, 240));
        Ok(())
    }

    #[test]
    fn synthetic_camera_is_unbounded_by_default() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://cam"))?;
        source.connect()?;
        for _ in 0..100 {
            assert!(source.next_frame()?.is_some());
        }
        assert_eq!(source.stats().frames_captured, 100);
        Ok(())
    }

    #[test]
    fn bounded_synthetic_camera_ends() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://cam?frames=1"))?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        Ok(())
    }
}
