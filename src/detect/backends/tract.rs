#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::letterbox::Letterbox;
use crate::detect::result::{non_max_suppression, RawDetection};

/// Upper bound on boxes returned for one frame.
const MAX_DETECTIONS: usize = 300;

/// Tract-based backend for Ultralytics YOLO ONNX exports.
///
/// The model is expected to take a letterboxed `[1, 3, S, S]` RGB tensor
/// scaled to 0..1 and to emit `[1, 4 + classes, anchors]` rows of
/// `cx, cy, w, h` followed by per-class scores, in model-input pixels. Boxes
/// are returned after NMS in descending confidence, mapped back to the source
/// frame.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    nms_iou: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            nms_iou: 0.7,
        })
    }

    /// Override the default NMS IoU threshold.
    pub fn with_nms_iou(mut self, nms_iou: f32) -> Self {
        self.nms_iou = nms_iou;
        self
    }

    fn build_input(&self, image: &RgbImage) -> Result<(Tensor, Letterbox)> {
        let side = self.input_size;
        let letterbox = Letterbox::fit(image.width(), image.height(), side)
            .ok_or_else(|| anyhow!("frame has no pixels"))?;
        let padded = letterbox.apply(image);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, side as usize, side as usize),
            |(_, channel, y, x)| padded.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        Ok((input.into_tensor(), letterbox))
    }

    fn decode(
        &self,
        outputs: TVec<TValue>,
        letterbox: &Letterbox,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output is not rank 3")?;
        let (batch, dim1, dim2) = view.dim();
        if batch != 1 {
            bail!("expected batch size 1, got {}", batch);
        }
        // Exports are [1, 4 + classes, anchors]; some are transposed.
        let transposed = dim1 > dim2;
        let (channels, anchors) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
        if channels < 5 {
            bail!("model output has {} channels, expected at least 5", channels);
        }
        let at = |channel: usize, anchor: usize| {
            if transposed {
                view[[0, anchor, channel]]
            } else {
                view[[0, channel, anchor]]
            }
        };

        let mut candidates = Vec::new();
        for anchor in 0..anchors {
            let confidence = (4..channels)
                .map(|channel| at(channel, anchor))
                .fold(f32::NEG_INFINITY, f32::max);
            if !confidence.is_finite() || confidence < confidence_threshold {
                continue;
            }
            let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
            candidates.push(RawDetection::new(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                confidence,
            ));
        }

        Ok(non_max_suppression(candidates, self.nms_iou, MAX_DETECTIONS)
            .iter()
            .map(|raw| letterbox.unmap(raw))
            .collect())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn predict(
        &mut self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>> {
        let (input, letterbox) = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, &letterbox, confidence_threshold)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = RgbImage::new(self.input_size, self.input_size);
        self.predict(&blank, 1.0).map(|_| ())
    }
}
