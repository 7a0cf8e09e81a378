use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a detection run.
///
/// Nothing in the pipeline recovers from these locally; each one is surfaced
/// to the caller unchanged and no output table is written.
#[derive(Debug, Error)]
pub enum PitchError {
    /// Source video is missing or cannot be opened.
    #[error("invalid video path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Detector model file is missing or unusable.
    #[error("failed to load model {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// No release event was found in the video.
    #[error("release frame not found: {0}")]
    NotFound(String),

    /// Output table could not be written.
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Opaque failure surfaced by the detection backend.
    #[error("detector failed")]
    Detector(#[source] anyhow::Error),

    /// Decoder failed after the video was opened.
    #[error("video decode failed")]
    Decode(#[source] anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PitchError {
    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = PitchError> = std::result::Result<T, E>;
