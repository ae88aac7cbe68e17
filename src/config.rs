use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::ingest::{CameraConfig, FileConfig};

const DEFAULT_MODEL_PATH: &str = "ppe.onnx";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_FILE_FPS: u32 = 0;
const DEFAULT_WINDOW_NAME: &str = "Object Detection";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    model: Option<ModelConfigFile>,
    camera: Option<CameraConfigFile>,
    file: Option<FileConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    warm_up: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    index: Option<u32>,
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfigFile {
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    window_name: Option<String>,
    backend: Option<DisplayBackend>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub camera: CameraSettings,
    pub file: FileSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX file, or `stub://...` for the scripted backend.
    pub path: String,
    pub input_width: u32,
    pub input_height: u32,
    pub warm_up: bool,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub index: u32,
    /// Overrides the `/dev/video<index>` device path.
    pub device: Option<String>,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl CameraSettings {
    /// Capture configuration for camera `index`, or the configured one.
    pub fn camera_config(&self, index: Option<u32>) -> CameraConfig {
        let mut config = CameraConfig::for_index(index.unwrap_or(self.index));
        // An explicit index on the command line wins over the configured device path.
        if index.is_none() {
            if let Some(device) = &self.device {
                config.device = device.clone();
            }
        }
        config.target_fps = self.target_fps;
        config.width = self.width;
        config.height = self.height;
        config
    }
}

#[derive(Debug, Clone)]
pub struct FileSettings {
    pub target_fps: u32,
}

impl FileSettings {
    pub fn file_config(&self, path: impl Into<String>) -> FileConfig {
        FileConfig {
            path: path.into(),
            target_fps: self.target_fps,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub window_name: String,
    pub backend: DisplayBackend,
}

/// Which display surface a run presents frames on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// A window when compiled with `display-opencv`, headless otherwise.
    Auto,
    /// Always a window; fails without `display-opencv`.
    Window,
    Headless,
}

impl FromStr for DisplayBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "window" => Ok(Self::Window),
            "headless" => Ok(Self::Headless),
            other => Err(anyhow!(
                "unknown display backend '{}' (expected auto, window or headless)",
                other
            )),
        }
    }
}

/// Command-line values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_path: Option<String>,
    pub display: Option<DisplayBackend>,
}

impl AppConfig {
    /// Load from an optional JSON or TOML file, apply overrides, validate.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let display = file.display.unwrap_or_default();
        Self {
            model: ModelSettings {
                path: model.path.unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
                input_width: model.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
                input_height: model.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
                warm_up: model.warm_up.unwrap_or(true),
            },
            camera: CameraSettings {
                index: camera.index.unwrap_or(DEFAULT_CAMERA_INDEX),
                device: camera.device,
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            },
            file: FileSettings {
                target_fps: file
                    .file
                    .and_then(|file| file.target_fps)
                    .unwrap_or(DEFAULT_FILE_FPS),
            },
            display: DisplaySettings {
                window_name: display
                    .window_name
                    .unwrap_or_else(|| DEFAULT_WINDOW_NAME.to_string()),
                backend: display.backend.unwrap_or(DisplayBackend::Auto),
            },
        }
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.model_path {
            if !path.trim().is_empty() {
                self.model.path = path.clone();
            }
        }
        if let Some(backend) = overrides.display {
            self.display.backend = backend;
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.model.path.trim().is_empty() {
            return Err(anyhow!("model path must not be empty"));
        }
        for (name, value) in [
            ("model input_width", self.model.input_width),
            ("model input_height", self.model.input_height),
        ] {
            if value == 0 || value % 32 != 0 {
                return Err(anyhow!("{} must be a positive multiple of 32, got {}", name, value));
            }
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if let Some(device) = &self.camera.device {
            if device.trim().is_empty() {
                self.camera.device = None;
            }
        }
        if self.display.window_name.trim().is_empty() {
            return Err(anyhow!("display window_name must not be empty"));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
