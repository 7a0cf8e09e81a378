//! Pitch detection export
//!
//! This crate runs a pretrained ball detector over the frames of a pitch video
//! that fall between the release and the ball reaching the plate, and exports
//! every box it finds to a CSV table for downstream pitch tracking.
//!
//! # Pipeline
//!
//! 1. **Load** the detector backend (`detect`).
//! 2. **Select** the frame-of-interest window from the release frame and the
//!    pitch velocity (`window`, `release`, `flight`).
//! 3. **Aggregate** boxes for every frame inside the window (`ingest`, `aggregate`).
//! 4. **Export** the boxes sorted by frame (`export`).
//!
//! `runner::Runner` drives these steps in order and aborts on the first error;
//! a failed run never writes an output file.
//!
//! # Module Structure
//!
//! - `frame`: Decoded frames (index + RGB image)
//! - `ingest`: Frame sources (local files via FFmpeg, synthetic `stub://` videos)
//! - `detect`: Detector backends (tract ONNX, stub, scripted)
//! - `config`: Run configuration (TOML file + `PITCH_*` environment)

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod flight;
pub mod frame;
pub mod ingest;
pub mod release;
pub mod runner;
pub mod window;

pub use aggregate::{
    collect_detections, Aggregation, Detection, AGGREGATION_CONFIDENCE, SCAN_CONFIDENCE,
};
pub use config::PipelineConfig;
pub use detect::{
    load_backend, BackendKind, BackendSettings, DetectorBackend, RawDetection, ScriptedBackend,
    StubBackend,
};
pub use error::PitchError;
pub use export::DetectionTable;
pub use flight::{DurationModel, FlightTimeModel};
pub use frame::Frame;
pub use ingest::{FileOpener, FileSource, FrameSource, VideoOpener};
pub use release::{FixedRelease, MotionReleaseDetector, ReleaseDetector};
pub use runner::{RunReport, RunState, Runner};
pub use window::{select_window, FrameWindow};
