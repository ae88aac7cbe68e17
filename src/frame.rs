//! Frame container.
//!
//! - `Frame`: one decoded RGB24 image, the unit of work of the detection loop.
//! - Overlays draw straight into the backing `RgbImage` through `image_mut`.
//!
//! A frame is owned by the loop for exactly one iteration: it is pulled from a
//! source, annotated in place, presented, then dropped.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Pixel color used by every drawing primitive in the crate.
pub type Color = Rgb<u8>;

/// Width of the fixed canvas live frames are resized to.
pub const CANVAS_WIDTH: u32 = 800;

/// Height of the fixed canvas live frames are resized to.
pub const CANVAS_HEIGHT: u32 = 600;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Decoded RGB24 frame, row-major, 3 bytes per pixel.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap packed RGB24 bytes. Fails when the buffer does not match the dimensions.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("failed to build {}x{} frame", width, height))?;
        Ok(Self { image })
    }

    /// A frame filled with a single color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, color),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Packed RGB24 bytes.
    pub fn as_rgb(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Color at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Bilinear resize to exactly `width` x `height`.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.width() == width && self.height() == height {
            return self.clone();
        }
        Self {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }

    /// Resize to the fixed 800x600 canvas used by the live path.
    pub fn resized_to_canvas(&self) -> Self {
        self.resized(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    /// Mutable pixel buffer, for drawing overlays in place.
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = Rgb([255, 255, 255]);

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(vec![0u8; 12], 2, 2).is_ok());
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2).is_err());
    }

    #[test]
    fn resized_to_canvas_has_fixed_dimensions() {
        let frame = Frame::filled(1280, 720, WHITE);
        let resized = frame.resized_to_canvas();

        assert_eq!(resized.width(), CANVAS_WIDTH);
        assert_eq!(resized.height(), CANVAS_HEIGHT);
        assert_eq!(resized.pixel(400, 300), Some(WHITE));
    }
}
