use anyhow::Result;
#[cfg(feature = "backend-tract")]
use anyhow::{anyhow, Context};

use crate::config::ModelSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::backends::StubBackend;
#[cfg(feature = "backend-tract")]
use crate::detect::backends::TractBackend;

/// Load the detector named by `model.path`.
///
/// `stub://` paths select the scripted backend (no detections); anything else
/// is treated as a local ONNX file and requires the `backend-tract` feature.
pub fn load_backend(model: &ModelSettings, num_classes: usize) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = if model.path.starts_with("stub://") {
        log::info!("detector: using stub backend for {}", model.path);
        Box::new(StubBackend::new())
    } else {
        load_onnx(model, num_classes)?
    };

    if model.warm_up {
        backend.warm_up()?;
        log::debug!("detector: {} warmed up", backend.name());
    }
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn load_onnx(model: &ModelSettings, num_classes: usize) -> Result<Box<dyn DetectorBackend>> {
    let path = std::path::Path::new(&model.path);
    if !path.is_file() {
        return Err(anyhow!("model file {} not found", path.display()));
    }
    let backend = TractBackend::new(path, model.input_width, model.input_height, num_classes)
        .with_context(|| format!("failed to initialise detector from {}", path.display()))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn load_onnx(model: &ModelSettings, _num_classes: usize) -> Result<Box<dyn DetectorBackend>> {
    anyhow::bail!(
        "loading {} requires the backend-tract feature",
        model.path
    )
}
