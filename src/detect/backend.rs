use anyhow::Result;
use image::RgbImage;

use super::result::RawDetection;

/// Detector backend trait.
///
/// Implementations wrap a pretrained model (or a deterministic fake) behind a
/// single prediction call. Output boxes are in source-image pixel coordinates
/// and in the backend's native order; callers must not assume they are sorted
/// by position.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame, keeping boxes scoring at least `confidence_threshold`.
    fn predict(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: DetectorBackend + ?Sized> DetectorBackend for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn predict(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        (**self).predict(image, confidence_threshold)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
