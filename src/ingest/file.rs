//! Local file frame source.
//!
//! This module provides `FileSource` for reading frames from a local video file.
//! The file source is responsible for:
//! - Rejecting paths that do not name a readable local file
//! - Decoding video frames in-memory, in order
//! - Numbering frames from 0
//! - Releasing the decoder when dropped
//!
//! Paths of the form `stub://name?frames=N&release=R` select a synthetic video
//! instead of a decoder: a dark scene with a small bright square that drifts
//! one pixel per frame and jumps sideways at frame `R`. Without `release` the
//! square never moves.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{FrameSource, VideoOpener};
use crate::error::{PitchError, Result};
use crate::frame::Frame;

/// Local file frame source.
pub struct FileSource {
    path: PathBuf,
    backend: FileBackend,
    frames_decoded: u64,
}

enum FileBackend {
    Synthetic(SyntheticVideo),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open a video for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = path.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(PitchError::invalid_path(path, "empty path"));
        }

        let backend = if let Some(rest) = raw.strip_prefix(STUB_SCHEME) {
            FileBackend::Synthetic(SyntheticVideo::parse(rest).map_err(|reason| {
                PitchError::invalid_path(path, reason)
            })?)
        } else if raw.contains("://") {
            return Err(PitchError::invalid_path(
                path,
                "only local paths are supported (no URL schemes)",
            ));
        } else if !path.is_file() {
            return Err(PitchError::invalid_path(path, "file does not exist"));
        } else {
            open_decoder(path)?
        };

        log::info!("FileSource: opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            backend,
            frames_decoded: 0,
        })
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frames_decoded,
            path: self.path.clone(),
        }
    }
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn open_decoder(path: &Path) -> Result<FileBackend> {
    let source =
        FfmpegFileSource::new(path).map_err(|e| PitchError::invalid_path(path, format!("{e:#}")))?;
    Ok(FileBackend::Ffmpeg(source))
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn open_decoder(path: &Path) -> Result<FileBackend> {
    Err(PitchError::invalid_path(
        path,
        "decoding video files requires the ingest-file-ffmpeg feature",
    ))
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let index = self.frames_decoded;
        let image = match &mut self.backend {
            FileBackend::Synthetic(video) => video.render(index),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_image().map_err(PitchError::Decode)?,
        };
        Ok(image.map(|image| {
            self.frames_decoded += 1;
            Frame::new(index, image)
        }))
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        log::debug!(
            "FileSource: released {} after {} frames",
            self.path.display(),
            self.frames_decoded
        );
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
    pub path: PathBuf,
}

/// Opens `FileSource`s; the default opener for a run.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileOpener;

impl VideoOpener for FileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(FileSource::open(path)?))
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

const STUB_SCHEME: &str = "stub://";
const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 120;
const SYNTHETIC_DEFAULT_FRAMES: u64 = 90;
/// Side length of the bright square, in pixels.
pub const SYNTHETIC_BALL_SIZE: u32 = 6;
const SYNTHETIC_BALL_Y: u32 = 57;
const SYNTHETIC_RELEASE_JUMP: u32 = 40;
const SYNTHETIC_BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
const SYNTHETIC_BALL: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Clone, Debug, PartialEq, Eq)]
struct SyntheticVideo {
    frames: u64,
    release: Option<u64>,
}

impl SyntheticVideo {
    fn parse(uri: &str) -> std::result::Result<Self, String> {
        let query = uri.split_once('?').map(|(_, query)| query).unwrap_or("");
        let mut video = Self {
            frames: SYNTHETIC_DEFAULT_FRAMES,
            release: None,
        };
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("malformed stub parameter '{pair}'"))?;
            let value: u64 = value
                .parse()
                .map_err(|_| format!("stub parameter '{key}' must be an integer"))?;
            match key {
                "frames" => video.frames = value,
                "release" => video.release = Some(value),
                other => return Err(format!("unknown stub parameter '{other}'")),
            }
        }
        Ok(video)
    }

    fn ball_x(&self, index: u64) -> u32 {
        let max_x = SYNTHETIC_WIDTH - SYNTHETIC_BALL_SIZE;
        let x = match self.release {
            None => 10,
            Some(release) if index < release => 10 + index,
            Some(_) => 10 + index + SYNTHETIC_RELEASE_JUMP as u64,
        };
        x.min(max_x as u64) as u32
    }

    fn render(&self, index: u64) -> Option<RgbImage> {
        if index >= self.frames {
            return None;
        }
        let x0 = self.ball_x(index);
        let y0 = SYNTHETIC_BALL_Y;
        Some(RgbImage::from_fn(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, |x, y| {
            let in_ball = (x0..x0 + SYNTHETIC_BALL_SIZE).contains(&x)
                && (y0..y0 + SYNTHETIC_BALL_SIZE).contains(&y);
            if in_ball {
                SYNTHETIC_BALL
            } else {
                SYNTHETIC_BACKGROUND
            }
        }))
    }
}

/// Build a synthetic video path understood by `FileSource::open`.
pub fn synthetic_path(name: &str, frames: u64, release: Option<u64>) -> PathBuf {
    let mut path = format!("{STUB_SCHEME}{name}?frames={frames}");
    if let Some(release) = release {
        path.push_str(&format!("&release={release}"));
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut FileSource) -> Vec<u64> {
        let mut indices = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            indices.push(frame.index);
        }
        indices
    }

    #[test]
    fn synthetic_frames_are_numbered_from_zero() {
        let mut source = FileSource::open(synthetic_path("clip", 5, None)).unwrap();
        assert_eq!(drain(&mut source), vec![0, 1, 2, 3, 4]);
        assert_eq!(source.stats().frames_decoded, 5);
    }

    #[test]
    fn exhausted_source_stays_exhausted() {
        let mut source = FileSource::open(synthetic_path("clip", 1, None)).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let err = FileSource::open("/definitely/not/here.mp4")
            .err()
            .expect("open should fail");
        assert!(matches!(err, PitchError::InvalidPath { .. }));
    }

    #[test]
    fn url_schemes_are_rejected() {
        let err = FileSource::open("rtsp://camera/stream").err().unwrap();
        assert!(matches!(err, PitchError::InvalidPath { .. }));
    }

    #[test]
    fn malformed_stub_parameters_are_rejected() {
        assert!(FileSource::open("stub://clip?frames=ten").is_err());
        assert!(FileSource::open("stub://clip?speed=3").is_err());
    }

    #[test]
    fn synthetic_ball_jumps_at_release() {
        let video = SyntheticVideo::parse("clip?frames=50&release=20").unwrap();
        assert_eq!(video.ball_x(19) + 1, video.ball_x(20) - SYNTHETIC_RELEASE_JUMP);
        assert_eq!(video.ball_x(21), video.ball_x(20) + 1);
    }
}
