use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PitchError, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;

/// Detector backends a run can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Deterministic bright-pixel detector; needs no model file.
    Stub,
    /// ONNX model executed with tract (feature: backend-tract).
    Tract,
}

impl FromStr for BackendKind {
    type Err = PitchError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "tract" | "onnx" => Ok(Self::Tract),
            other => Err(PitchError::Config(format!(
                "unknown detector backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stub => f.write_str("stub"),
            Self::Tract => f.write_str("tract"),
        }
    }
}

/// Everything needed to load a detector backend.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub model_path: PathBuf,
    /// Square model input side, in pixels.
    pub input_size: u32,
    pub nms_iou: f32,
}

/// Load the configured backend and warm it up.
///
/// Any failure, including a missing model file, is reported as `ModelLoad`.
pub fn load_backend(settings: &BackendSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = match settings.kind {
        BackendKind::Stub => Box::new(StubBackend::new()),
        BackendKind::Tract => load_tract(settings)?,
    };
    backend.warm_up().map_err(|source| PitchError::ModelLoad {
        path: settings.model_path.clone(),
        source,
    })?;
    log::info!(
        "detector backend '{}' ready ({})",
        backend.name(),
        settings.model_path.display()
    );
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn load_tract(settings: &BackendSettings) -> Result<Box<dyn DetectorBackend>> {
    use super::backends::TractBackend;

    let model_load = |source: anyhow::Error| PitchError::ModelLoad {
        path: settings.model_path.clone(),
        source,
    };
    if !settings.model_path.is_file() {
        return Err(model_load(anyhow::anyhow!("model file does not exist")));
    }
    let backend = TractBackend::new(&settings.model_path, settings.input_size)
        .map_err(model_load)?
        .with_nms_iou(settings.nms_iou);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn load_tract(settings: &BackendSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(PitchError::ModelLoad {
        path: settings.model_path.clone(),
        source: anyhow::anyhow!("the tract backend requires the backend-tract feature"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: BackendKind) -> BackendSettings {
        BackendSettings {
            kind,
            model_path: PathBuf::from("/nonexistent/best.onnx"),
            input_size: 640,
            nms_iou: 0.7,
        }
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!("stub".parse::<BackendKind>().unwrap(), BackendKind::Stub);
        assert_eq!(" ONNX ".parse::<BackendKind>().unwrap(), BackendKind::Tract);
        assert!("yolo".parse::<BackendKind>().is_err());
    }

    #[test]
    fn stub_backend_needs_no_model() {
        let backend = load_backend(&settings(BackendKind::Stub)).unwrap();
        assert_eq!(backend.name(), "stub");
    }

    #[test]
    fn missing_model_is_model_load_error() {
        let err = load_backend(&settings(BackendKind::Tract)).err().unwrap();
        assert!(matches!(err, PitchError::ModelLoad { .. }));
    }
}
