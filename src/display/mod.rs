//! Display surfaces.
//!
//! A run presents every annotated frame on exactly one `DisplaySurface` and
//! polls it for a key right after. Two surfaces exist:
//! - `HighguiDisplay`: a named, resizable, fullscreen OpenCV window
//!   (feature: display-opencv)
//! - `HeadlessDisplay`: no window and no keys, for servers and tests

#[cfg(feature = "display-opencv")]
mod highgui;

use anyhow::Result;

#[cfg(feature = "display-opencv")]
pub use highgui::HighguiDisplay;

use crate::config::{DisplayBackend, DisplaySettings};
use crate::frame::Frame;

const ESCAPE: i32 = 27;

/// A key read from a display surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Other(i32),
}

impl Key {
    /// Decode a raw key code; negative codes mean no key was pressed.
    pub fn from_code(code: i32) -> Option<Self> {
        if code < 0 {
            return None;
        }
        let code = code & 0xFF;
        if code == ESCAPE {
            return Some(Key::Escape);
        }
        Some(
            char::from_u32(code as u32)
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .map(Key::Char)
                .unwrap_or(Key::Other(code)),
        )
    }

    /// `q` and Escape end a run.
    pub fn is_quit(self) -> bool {
        matches!(self, Key::Char('q') | Key::Escape)
    }
}

/// Where annotated frames go.
pub trait DisplaySurface {
    fn name(&self) -> &str;

    /// Show `frame`, replacing whatever was shown before.
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Non-blocking key poll.
    fn poll_key(&mut self) -> Result<Option<Key>>;

    /// Dismiss the surface. Safe to call repeatedly.
    fn close(&mut self);
}

/// Surface that discards frames and never reports keys.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    presented: u64,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn name(&self) -> &str {
        "headless"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        self.closed = false;
        self.presented += 1;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<Key>> {
        Ok(None)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("HeadlessDisplay: closed after {} frames", self.presented);
        }
    }
}

/// Build the surface selected by `settings`.
pub fn open_display(settings: &DisplaySettings) -> Result<Box<dyn DisplaySurface>> {
    match settings.backend {
        DisplayBackend::Headless => Ok(Box::new(HeadlessDisplay::new())),
        #[cfg(feature = "display-opencv")]
        DisplayBackend::Auto | DisplayBackend::Window => {
            Ok(Box::new(HighguiDisplay::new(&settings.window_name)))
        }
        #[cfg(not(feature = "display-opencv"))]
        DisplayBackend::Auto => {
            log::info!("display: built without display-opencv, running headless");
            Ok(Box::new(HeadlessDisplay::new()))
        }
        #[cfg(not(feature = "display-opencv"))]
        DisplayBackend::Window => {
            anyhow::bail!("a display window requires the display-opencv feature")
        }
    }
}
