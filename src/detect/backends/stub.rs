use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::luma;

/// Luma at or above which a pixel counts as part of the ball.
const BRIGHT_LUMA: f64 = 200.0;
const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend for testing. Boxes the bright pixels of a frame.
///
/// Deterministic: the same image always yields the same single box (or none).
#[derive(Clone, Copy, Debug, Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn predict(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        if STUB_CONFIDENCE < confidence_threshold {
            return Ok(Vec::new());
        }

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in image.enumerate_pixels() {
            if luma(pixel.0) < BRIGHT_LUMA {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
            });
        }

        Ok(bounds
            .map(|(x1, y1, x2, y2)| {
                RawDetection::new(
                    x1 as f32,
                    y1 as f32,
                    (x2 + 1) as f32,
                    (y2 + 1) as f32,
                    STUB_CONFIDENCE,
                )
            })
            .into_iter()
            .collect())
    }
}
