//! End-to-end detection run for one pitch video.
//!
//! The run is linear: load the detector, compute the frame window, analyze
//! the frames inside it, export the table. Any failure aborts the run with
//! the originating error and nothing is written.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::aggregate::collect_detections;
use crate::config::PipelineConfig;
use crate::detect::{load_backend, DetectorBackend};
use crate::error::{PitchError, Result};
use crate::export::DetectionTable;
use crate::flight::DurationModel;
use crate::ingest::{FileOpener, VideoOpener};
use crate::release::{MotionReleaseDetector, ReleaseDetector};
use crate::window::{select_window, FrameWindow};

/// Progress of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Init,
    ModelLoaded,
    WindowComputed,
    FramesAnalyzed,
    Exported,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ModelLoaded => "model-loaded",
            Self::WindowComputed => "window-computed",
            Self::FramesAnalyzed => "frames-analyzed",
            Self::Exported => "exported",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub window: FrameWindow,
    pub frames_read: u64,
    pub frames_analyzed: u64,
    pub rows: usize,
    pub output: PathBuf,
    /// SHA-256 of the exported table.
    pub digest: String,
}

/// Runs the detection pipeline for one configured video.
///
/// Collaborators default to the configured detector backend, motion-based
/// release detection, the constant-velocity flight model and the local file
/// opener. Each can be replaced before `run`. Unless a release detector is
/// supplied, release detection reads the video through the same opener as
/// frame analysis.
pub struct Runner {
    config: PipelineConfig,
    detector: Option<Box<dyn DetectorBackend>>,
    release: Option<Box<dyn ReleaseDetector>>,
    durations: Box<dyn DurationModel>,
    opener: Rc<dyn VideoOpener>,
    state: RunState,
}

impl Runner {
    pub fn new(config: PipelineConfig) -> Self {
        let durations = Box::new(config.flight);
        Self {
            config,
            detector: None,
            release: None,
            durations,
            opener: Rc::new(FileOpener),
            state: RunState::Init,
        }
    }

    /// Use an already-loaded detector instead of loading the configured one.
    pub fn with_detector(mut self, detector: Box<dyn DetectorBackend>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_release_detector(mut self, release: Box<dyn ReleaseDetector>) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_duration_model(mut self, durations: Box<dyn DurationModel>) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_opener(mut self, opener: Box<dyn VideoOpener>) -> Self {
        self.opener = Rc::from(opener);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute the run. A runner can only run once.
    pub fn run(&mut self) -> Result<RunReport> {
        match self.advance() {
            Ok(report) => Ok(report),
            Err(err) => {
                log::error!("run aborted in state {}: {}", self.state, err);
                self.state = RunState::Aborted;
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<RunReport> {
        if self.state != RunState::Init {
            return Err(PitchError::Config(format!(
                "runner already {}",
                self.state
            )));
        }

        let mut detector = match self.detector.take() {
            Some(detector) => detector,
            None => load_backend(&self.config.detector)?,
        };
        self.transition(RunState::ModelLoaded);

        let mut release: Box<dyn ReleaseDetector> = match self.release.take() {
            Some(release) => release,
            None => Box::new(MotionReleaseDetector::with_opener(
                Rc::clone(&self.opener),
                self.config.min_release_motion,
            )),
        };
        let window = select_window(
            self.config.release_frame,
            self.config.velocity_mph,
            self.durations.as_ref(),
            release.as_mut(),
            &self.config.video_path,
        )?;
        self.transition(RunState::WindowComputed);

        let aggregation = {
            let mut source = self.opener.open(&self.config.video_path)?;
            collect_detections(
                source.as_mut(),
                detector.as_mut(),
                window,
                self.config.confidence_threshold,
            )?
        };
        self.transition(RunState::FramesAnalyzed);

        let table = DetectionTable::from_records(aggregation.detections);
        let digest = table
            .digest()
            .map_err(|e| PitchError::write(&self.config.output_path, e))?;
        table.write_csv(&self.config.output_path)?;
        self.transition(RunState::Exported);
        log::info!("table sha256={}", digest);

        let report = RunReport {
            window,
            frames_read: aggregation.frames_read,
            frames_analyzed: aggregation.frames_analyzed,
            rows: table.len(),
            output: self.config.output_path.clone(),
            digest,
        };
        self.transition(RunState::Done);
        Ok(report)
    }

    fn transition(&mut self, next: RunState) {
        log::info!("run state {} -> {}", self.state, next);
        self.state = next;
    }
}
