//! Frame-of-interest selection.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::flight::DurationModel;
use crate::release::ReleaseDetector;

/// Inclusive range of frame indices analyzed in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameWindow {
    start: u64,
    end: u64,
}

impl FrameWindow {
    /// Window `[start, end]`; the bounds are swapped if given in reverse.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Every frame of the video.
    pub fn unbounded() -> Self {
        Self::new(0, u64::MAX)
    }

    /// Window opening at the release frame and lasting `duration_frames` frames past it.
    pub fn from_release(release_frame: u64, duration_frames: u64) -> Self {
        Self::new(release_frame, release_frame.saturating_add(duration_frames))
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn contains(&self, frame_index: u64) -> bool {
        (self.start..=self.end).contains(&frame_index)
    }

    /// True once `frame_index` is past the end of the window.
    pub fn is_past(&self, frame_index: u64) -> bool {
        frame_index > self.end
    }

    /// Number of frames in the window.
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// An inclusive window always holds at least one frame.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for FrameWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Compute the frame-of-interest window for one pitch.
///
/// A known `release_frame` is used as-is. Otherwise `detector` is asked to
/// locate the release in `video_path`; if it reports `NotFound` the error is
/// returned and no window is computed.
pub fn select_window(
    release_frame: Option<u64>,
    velocity_mph: f64,
    durations: &dyn DurationModel,
    detector: &mut dyn ReleaseDetector,
    video_path: &Path,
) -> Result<FrameWindow> {
    let release = match release_frame {
        Some(frame) => frame,
        None => detector.find_release(video_path)?,
    };
    let duration = durations.duration_frames(velocity_mph);
    let window = FrameWindow::from_release(release, duration);
    log::info!(
        "frame window {} (release {}, {} mph -> {} frames)",
        window,
        release,
        velocity_mph,
        duration
    );
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PitchError;

    struct ConstantDuration(u64);

    impl DurationModel for ConstantDuration {
        fn duration_frames(&self, _velocity_mph: f64) -> u64 {
            self.0
        }
    }

    struct NoRelease {
        calls: usize,
    }

    impl ReleaseDetector for NoRelease {
        fn find_release(&mut self, _video_path: &Path) -> Result<u64> {
            self.calls += 1;
            Err(PitchError::NotFound("no release".into()))
        }
    }

    #[test]
    fn window_is_inclusive() {
        let window = FrameWindow::new(100, 130);
        assert!(window.contains(100));
        assert!(window.contains(130));
        assert!(!window.contains(99));
        assert!(!window.contains(131));
        assert!(window.is_past(131));
        assert_eq!(window.len(), 31);
    }

    #[test]
    fn unbounded_window_saturates() {
        let window = FrameWindow::from_release(u64::MAX - 1, 10);
        assert_eq!(window.end(), u64::MAX);
        assert_eq!(FrameWindow::unbounded().len(), u64::MAX);
    }

    #[test]
    fn known_release_skips_detection() {
        let mut detector = NoRelease { calls: 0 };
        let window = select_window(
            Some(100),
            95.0,
            &ConstantDuration(30),
            &mut detector,
            Path::new("pitch.mp4"),
        )
        .unwrap();
        assert_eq!(window, FrameWindow::new(100, 130));
        assert_eq!(detector.calls, 0);
    }

    #[test]
    fn unknown_release_propagates_not_found() {
        let mut detector = NoRelease { calls: 0 };
        let err = select_window(
            None,
            95.0,
            &ConstantDuration(30),
            &mut detector,
            Path::new("pitch.mp4"),
        )
        .unwrap_err();
        assert!(matches!(err, PitchError::NotFound(_)));
        assert_eq!(detector.calls, 1);
    }
}
