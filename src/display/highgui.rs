use anyhow::{Context, Result};
use opencv::core::{Mat, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;

use super::{DisplaySurface, Key};
use crate::frame::Frame;

/// OpenCV window, created on the first frame and reused until closed.
pub struct HighguiDisplay {
    window_name: String,
    open: bool,
}

impl HighguiDisplay {
    pub fn new(window_name: &str) -> Self {
        Self {
            window_name: window_name.to_string(),
            open: false,
        }
    }

    fn ensure_window(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        highgui::named_window(&self.window_name, highgui::WINDOW_NORMAL)
            .with_context(|| format!("create window '{}'", self.window_name))?;
        if let Err(err) = highgui::set_window_property(
            &self.window_name,
            highgui::WND_PROP_FULLSCREEN,
            highgui::WINDOW_FULLSCREEN as f64,
        ) {
            log::warn!("HighguiDisplay: fullscreen unavailable: {}", err);
        }
        self.open = true;
        log::debug!("HighguiDisplay: opened '{}'", self.window_name);
        Ok(())
    }
}

/// Copy an RGB frame into a BGR `Mat`.
fn to_bgr_mat(frame: &Frame) -> Result<Mat> {
    // SAFETY: every byte of the freshly allocated buffer is overwritten below.
    let mut mat = unsafe {
        Mat::new_rows_cols(frame.height() as i32, frame.width() as i32, CV_8UC3)
            .context("allocate display buffer")?
    };
    let dst = mat.data_bytes_mut().context("access display buffer")?;
    for (out, rgb) in dst.chunks_exact_mut(3).zip(frame.as_rgb().chunks_exact(3)) {
        out[0] = rgb[2];
        out[1] = rgb[1];
        out[2] = rgb[0];
    }
    Ok(mat)
}

impl DisplaySurface for HighguiDisplay {
    fn name(&self) -> &str {
        &self.window_name
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.ensure_window()?;
        let mat = to_bgr_mat(frame)?;
        highgui::imshow(&self.window_name, &mat).context("show frame")?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<Key>> {
        if !self.open {
            return Ok(None);
        }
        let code = highgui::wait_key(1).context("poll window keys")?;
        Ok(Key::from_code(code))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(err) = highgui::destroy_window(&self.window_name) {
            log::warn!("HighguiDisplay: failed to close '{}': {}", self.window_name, err);
        }
        // Let the GUI loop process the destroy.
        if let Err(err) = highgui::wait_key(1) {
            log::debug!("HighguiDisplay: event pump after close failed: {}", err);
        }
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        self.close();
    }
}
