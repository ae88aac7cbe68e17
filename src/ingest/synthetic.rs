//! Synthetic frame generator behind `stub://` sources.
//!
//! `stub://<name>[?frames=N&width=W&height=H]` produces deterministic gradient
//! frames. Without `frames` the stream falls back to the caller's default
//! length (`None` = unbounded).

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

pub(crate) const STUB_SCHEME: &str = "stub://";

#[derive(Clone, Debug)]
pub(crate) struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
}

impl SyntheticSource {
    /// Parse a `stub://` locator. `defaults` supplies size and length when the query omits them.
    pub(crate) fn parse(
        locator: &str,
        default_width: u32,
        default_height: u32,
        default_frames: Option<u64>,
    ) -> Result<Self> {
        let rest = locator
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("not a stub locator: {}", locator))?;
        let (name, query) = rest.split_once('?').unwrap_or((rest, ""));

        let mut source = Self {
            name: name.to_string(),
            width: default_width,
            height: default_height,
            frame_limit: default_frames,
            frame_count: 0,
        };

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            let parsed: u64 = value
                .parse()
                .map_err(|_| anyhow!("stub parameter '{}' must be an integer", key))?;
            match key {
                "frames" => source.frame_limit = Some(parsed),
                "width" => source.width = dimension(key, parsed)?,
                "height" => source.height = dimension(key, parsed)?,
                other => return Err(anyhow!("unknown stub parameter '{}'", other)),
            }
        }

        if source.width == 0 || source.height == 0 {
            return Err(anyhow!("stub frame size must be non-zero"));
        }
        Ok(source)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Next frame, or `None` once the configured length is reached.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_limit.is_some_and(|limit| self.frame_count >= limit) {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::from_rgb(pixels, self.width, self.height).map(Some)
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

fn dimension(key: &str, value: u64) -> Result<u32> {
    u32::try_from(value).with_context(|| format!("stub parameter '{}' out of range: {}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_parameters() -> Result<()> {
        let source = SyntheticSource::parse("stub://clip?frames=3&width=32&height=16", 640, 480, None)?;
        assert_eq!(source.name(), "clip");
        assert_eq!((source.width, source.height), (32, 16));
        assert_eq!(source.frame_limit, Some(3));
        Ok(())
    }

    #[test]
    fn finite_stream_ends() -> Result<()> {
        let mut source = SyntheticSource::parse("stub://clip?frames=2", 8, 8, None)?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frame_count(), 2);
        Ok(())
    }

    #[test]
    fn rejects_unknown_parameters() {
        assert!(SyntheticSource::parse("stub://clip?fps=3", 8, 8, None).is_err());
        assert!(SyntheticSource::parse("stub://clip?frames=x", 8, 8, None).is_err());
        assert!(SyntheticSource::parse("stub://clip?width=0", 8, 8, None).is_err());
    }

    #[test]
    fn rejects_dimensions_beyond_u32() {
        let err = SyntheticSource::parse("stub://clip?width=4294967297", 8, 8, None).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{}", err);
        assert!(SyntheticSource::parse("stub://clip?height=4294967296", 8, 8, None).is_err());
    }
}
