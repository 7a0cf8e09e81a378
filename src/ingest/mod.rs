//! Video frame sources.
//!
//! This module provides the sources a detection run reads frames from:
//! - Local video files decoded with FFmpeg (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` videos (testing and demos)
//!
//! Every source yields `Frame`s lazily, in strictly increasing index order
//! starting at 0, and returns `None` once the stream is exhausted. Sources
//! are not restartable; reopen the path to read the video again.
//!
//! Decoder resources are owned by the source and released when it is dropped,
//! so an early `break` out of a read loop or a `?` on a decode error releases
//! the handle exactly once.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

use std::path::Path;
use std::rc::Rc;

use crate::error::Result;
use crate::frame::Frame;

pub use file::{FileOpener, FileSource, FileStats};

/// A lazy, finite, non-restartable sequence of decoded frames.
pub trait FrameSource {
    /// Decode the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Opens a frame source for a video path.
///
/// Fails with `PitchError::InvalidPath` when the video does not exist or
/// cannot be opened.
pub trait VideoOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

impl<O: VideoOpener + ?Sized> VideoOpener for Rc<O> {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        (**self).open(path)
    }
}
