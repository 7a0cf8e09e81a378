//! Per-frame detection aggregation.
//!
//! Reads frames from a source, runs the detector only on frames inside the
//! frame-of-interest window, and numbers each returned box by its rank in the
//! detector's output.

use serde::{Deserialize, Serialize};

use crate::detect::{DetectorBackend, RawDetection};
use crate::error::{PitchError, Result};
use crate::ingest::FrameSource;
use crate::window::FrameWindow;

/// Confidence floor used while aggregating.
///
/// Must stay below `SCAN_CONFIDENCE`; filtering happens downstream of the
/// exported table.
pub const AGGREGATION_CONFIDENCE: f32 = 0.03;

/// User-facing threshold of the whole-video scan. Aggregation thresholds at
/// or above it are rejected by config validation.
pub const SCAN_CONFIDENCE: f32 = 0.15;

/// One exported box. Field order is the table's column order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "frame")]
    pub frame_index: u64,
    /// 1-based rank within the frame, in detector output order.
    #[serde(rename = "box_num")]
    pub box_ordinal: u32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl Detection {
    pub fn from_raw(frame_index: u64, box_ordinal: u32, raw: &RawDetection) -> Self {
        Self {
            frame_index,
            box_ordinal,
            x1: raw.x1,
            y1: raw.y1,
            x2: raw.x2,
            y2: raw.y2,
            confidence: raw.confidence,
        }
    }

    /// Composite key; unique across a run.
    pub fn key(&self) -> (u64, u32) {
        (self.frame_index, self.box_ordinal)
    }
}

/// Records collected from one pass over a video.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregation {
    /// Records in append order: frame ascending, then box ordinal.
    pub detections: Vec<Detection>,
    /// Frames up to the window end, including those skipped before the window.
    /// The frame past the window that ends the read is not counted.
    pub frames_read: u64,
    /// Frames handed to the detector.
    pub frames_analyzed: u64,
}

/// Run `detector` over the frames of `source` that fall inside `window`.
///
/// Frames before the window are decoded and discarded; reading stops at the
/// first frame past the window. A frame with no boxes contributes nothing.
pub fn collect_detections(
    source: &mut dyn FrameSource,
    detector: &mut dyn DetectorBackend,
    window: FrameWindow,
    confidence_threshold: f32,
) -> Result<Aggregation> {
    let mut aggregation = Aggregation::default();

    while let Some(frame) = source.next_frame()? {
        if window.is_past(frame.index) {
            break;
        }
        aggregation.frames_read += 1;
        if !window.contains(frame.index) {
            continue;
        }

        let boxes = detector
            .predict(&frame.image, confidence_threshold)
            .map_err(PitchError::Detector)?;
        aggregation.frames_analyzed += 1;
        log::debug!("frame {}: {} boxes", frame.index, boxes.len());

        aggregation.detections.extend(
            boxes
                .iter()
                .zip(1u32..)
                .map(|(raw, ordinal)| Detection::from_raw(frame.index, ordinal, raw)),
        );
    }

    if aggregation.frames_analyzed < window.len() && window != FrameWindow::unbounded() {
        log::warn!(
            "video ended before window {} closed; analyzed {} of {} frames",
            window,
            aggregation.frames_analyzed,
            window.len()
        );
    }
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ScriptedBackend;
    use crate::frame::Frame;
    use image::RgbImage;

    struct CountingSource {
        next: u64,
        total: u64,
    }

    impl FrameSource for CountingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.next >= self.total {
                return Ok(None);
            }
            let frame = Frame::new(self.next, RgbImage::new(2, 2));
            self.next += 1;
            Ok(Some(frame))
        }
    }

    fn boxes(n: usize) -> Vec<RawDetection> {
        (0..n)
            .map(|i| RawDetection::new(i as f32, 0.0, i as f32 + 1.0, 1.0, 0.5))
            .collect()
    }

    #[test]
    fn ordinals_follow_detector_order() {
        let mut source = CountingSource { next: 0, total: 10 };
        let mut detector = ScriptedBackend::new().on_call(2, boxes(3));
        let result = collect_detections(
            &mut source,
            &mut detector,
            FrameWindow::new(3, 6),
            AGGREGATION_CONFIDENCE,
        )
        .unwrap();

        let keys: Vec<_> = result.detections.iter().map(Detection::key).collect();
        assert_eq!(keys, vec![(5, 1), (5, 2), (5, 3)]);
        assert_eq!(result.detections[0].x1, 0.0);
        assert_eq!(result.detections[2].x1, 2.0);
        assert_eq!(result.frames_analyzed, 4);
    }

    #[test]
    fn stops_reading_after_window() {
        let mut source = CountingSource { next: 0, total: 100 };
        let mut detector = ScriptedBackend::new();
        let result = collect_detections(
            &mut source,
            &mut detector,
            FrameWindow::new(10, 12),
            AGGREGATION_CONFIDENCE,
        )
        .unwrap();
        // Frames 0..=12 count; frame 13 is decoded only to detect the end.
        assert_eq!(result.frames_read, 13);
        assert_eq!(source.next, 14);
        assert_eq!(result.frames_analyzed, 3);
    }

    #[test]
    fn more_than_a_hundred_boxes_keep_unique_keys() {
        let mut source = CountingSource { next: 0, total: 1 };
        let mut detector = ScriptedBackend::new().on_call(0, boxes(150));
        let result =
            collect_detections(&mut source, &mut detector, FrameWindow::new(0, 0), 0.0).unwrap();
        let mut keys: Vec<_> = result.detections.iter().map(Detection::key).collect();
        keys.dedup();
        assert_eq!(keys.len(), 150);
        assert_eq!(keys.last(), Some(&(0, 150)));
    }

    #[test]
    fn detector_failure_is_surfaced() {
        let mut source = CountingSource { next: 0, total: 5 };
        let mut detector = ScriptedBackend::new().fail_on_call(1);
        let err = collect_detections(
            &mut source,
            &mut detector,
            FrameWindow::new(0, 4),
            AGGREGATION_CONFIDENCE,
        )
        .unwrap_err();
        assert!(matches!(err, PitchError::Detector(_)));
    }
}
