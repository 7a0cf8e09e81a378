//! Release-frame detection.
//!
//! The release frame is the first frame of the pitch window. It is either
//! supplied up front (`FixedRelease`) or estimated from the video itself
//! (`MotionReleaseDetector`).

use std::path::Path;

use crate::error::{PitchError, Result};
use crate::frame::Frame;
use crate::ingest::{FileOpener, VideoOpener};

/// Locates the frame at which the ball leaves the pitcher's hand.
pub trait ReleaseDetector {
    /// Returns the release frame index, or `PitchError::NotFound`.
    fn find_release(&mut self, video_path: &Path) -> Result<u64>;
}

/// A release frame known ahead of time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRelease(pub u64);

impl ReleaseDetector for FixedRelease {
    fn find_release(&mut self, _video_path: &Path) -> Result<u64> {
        Ok(self.0)
    }
}

/// Estimates the release as the frame with the largest change from its predecessor.
///
/// The throwing arm reaches peak speed at release, which dominates the
/// frame-to-frame luma difference of a fixed broadcast camera. A peak below
/// `min_motion` (mean absolute luma delta, 0..=255) is treated as no release.
pub struct MotionReleaseDetector<O = FileOpener> {
    opener: O,
    min_motion: f64,
}

/// Default peak-motion threshold for `MotionReleaseDetector`.
pub const DEFAULT_MIN_MOTION: f64 = 0.25;

impl MotionReleaseDetector<FileOpener> {
    pub fn new(min_motion: f64) -> Self {
        Self::with_opener(FileOpener, min_motion)
    }
}

impl<O: VideoOpener> MotionReleaseDetector<O> {
    pub fn with_opener(opener: O, min_motion: f64) -> Self {
        Self { opener, min_motion }
    }
}

impl<O: VideoOpener> ReleaseDetector for MotionReleaseDetector<O> {
    fn find_release(&mut self, video_path: &Path) -> Result<u64> {
        let mut source = self.opener.open(video_path)?;
        let mut previous: Option<Frame> = None;
        let mut peak: Option<(u64, f64)> = None;

        while let Some(frame) = source.next_frame()? {
            if let Some(prev) = &previous {
                let delta = frame.mean_luma_delta(prev).ok_or_else(|| {
                    PitchError::Decode(anyhow::anyhow!(
                        "frame {} changed size mid-stream",
                        frame.index
                    ))
                })?;
                if peak.map_or(true, |(_, best)| delta > best) {
                    peak = Some((frame.index, delta));
                }
            }
            previous = Some(frame);
        }

        match peak {
            Some((index, delta)) if delta >= self.min_motion => {
                log::info!("release frame {} (motion {:.3})", index, delta);
                Ok(index)
            }
            Some((_, delta)) => Err(PitchError::NotFound(format!(
                "peak motion {:.3} below threshold {:.3} in {}",
                delta,
                self.min_motion,
                video_path.display()
            ))),
            None => Err(PitchError::NotFound(format!(
                "{} has fewer than two frames",
                video_path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::file::synthetic_path;

    #[test]
    fn motion_peak_marks_release() {
        let mut detector = MotionReleaseDetector::new(DEFAULT_MIN_MOTION);
        let release = detector
            .find_release(&synthetic_path("pitch", 60, Some(23)))
            .unwrap();
        assert_eq!(release, 23);
    }

    #[test]
    fn static_scene_has_no_release() {
        let mut detector = MotionReleaseDetector::new(DEFAULT_MIN_MOTION);
        let err = detector
            .find_release(&synthetic_path("static", 30, None))
            .unwrap_err();
        assert!(matches!(err, PitchError::NotFound(_)));
    }

    #[test]
    fn single_frame_has_no_release() {
        let mut detector = MotionReleaseDetector::new(0.0);
        let err = detector
            .find_release(&synthetic_path("still", 1, None))
            .unwrap_err();
        assert!(matches!(err, PitchError::NotFound(_)));
    }

    #[test]
    fn fixed_release_ignores_the_video() {
        let mut detector = FixedRelease(42);
        assert_eq!(detector.find_release(Path::new("unused.mp4")).unwrap(), 42);
    }
}
