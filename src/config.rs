use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::aggregate::{AGGREGATION_CONFIDENCE, SCAN_CONFIDENCE};
use crate::detect::{BackendKind, BackendSettings};
use crate::flight::FlightTimeModel;
use crate::release::DEFAULT_MIN_MOTION;

const DEFAULT_MODEL_PATH: &str = "runs/detect/pitch_detection_v5/weights/best.onnx";
const DEFAULT_BACKEND: BackendKind = BackendKind::Tract;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_NMS_IOU: f32 = 0.7;
const DEFAULT_PITCH_NAME: &str = "degrom1";
const DEFAULT_VIDEOS_DIR: &str = "pitcher_vids";
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";
const DEFAULT_CSV_DIR: &str = "csv";
const DEFAULT_PREDICTOR_SUFFIX: &str = "_predictor";
const DEFAULT_VELOCITY_MPH: f64 = 95.0;

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    model: Option<ModelConfigFile>,
    pitch: Option<PitchConfigFile>,
    output: Option<OutputConfigFile>,
    flight: Option<FlightConfigFile>,
    release: Option<ReleaseConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    backend: Option<String>,
    input_size: Option<u32>,
    nms_iou: Option<f32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct PitchConfigFile {
    name: Option<String>,
    videos_dir: Option<PathBuf>,
    video_extension: Option<String>,
    video_path: Option<PathBuf>,
    velocity_mph: Option<f64>,
    release_frame: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    csv_dir: Option<PathBuf>,
    predictor_suffix: Option<String>,
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct FlightConfigFile {
    fps: Option<f64>,
    release_distance_ft: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ReleaseConfigFile {
    min_motion: Option<f64>,
}

/// Settings for one detection run, built once and passed to the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub detector: BackendSettings,
    /// Confidence floor applied while aggregating.
    pub confidence_threshold: f32,
    pub pitch_name: String,
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub velocity_mph: f64,
    /// Known release frame; `None` means detect it from the video.
    pub release_frame: Option<u64>,
    pub flight: FlightTimeModel,
    /// Peak-motion threshold for release detection.
    pub min_release_motion: f64,
}

impl PipelineConfig {
    /// Load from `PITCH_CONFIG` (if set), apply `PITCH_*` overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PITCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides and validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Result<Self> {
        let model = file.model.unwrap_or_default();
        let pitch = file.pitch.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        let flight = file.flight.unwrap_or_default();
        let release = file.release.unwrap_or_default();

        let kind = match model.backend.as_deref() {
            Some(name) => name.parse::<BackendKind>().map_err(|e| anyhow!("{}", e))?,
            None => DEFAULT_BACKEND,
        };
        let detector = BackendSettings {
            kind,
            model_path: model
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_size: model.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            nms_iou: model.nms_iou.unwrap_or(DEFAULT_NMS_IOU),
        };

        let pitch_name = pitch
            .name
            .unwrap_or_else(|| DEFAULT_PITCH_NAME.to_string());
        let video_path = pitch.video_path.unwrap_or_else(|| {
            video_path_for(
                &pitch_name,
                pitch
                    .videos_dir
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_VIDEOS_DIR)),
                pitch
                    .video_extension
                    .as_deref()
                    .unwrap_or(DEFAULT_VIDEO_EXTENSION),
            )
        });
        let output_path = output.path.unwrap_or_else(|| {
            csv_path_for(
                &pitch_name,
                output
                    .csv_dir
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_CSV_DIR)),
                output
                    .predictor_suffix
                    .as_deref()
                    .unwrap_or(DEFAULT_PREDICTOR_SUFFIX),
            )
        });

        Ok(Self {
            detector,
            confidence_threshold: model
                .confidence_threshold
                .unwrap_or(AGGREGATION_CONFIDENCE),
            pitch_name,
            video_path,
            output_path,
            velocity_mph: pitch.velocity_mph.unwrap_or(DEFAULT_VELOCITY_MPH),
            release_frame: pitch.release_frame.and_then(release_from_signed),
            flight: FlightTimeModel::new(
                flight.fps.unwrap_or(FlightTimeModel::DEFAULT_FPS),
                flight
                    .release_distance_ft
                    .unwrap_or(FlightTimeModel::DEFAULT_RELEASE_DISTANCE_FT),
            ),
            min_release_motion: release.min_motion.unwrap_or(DEFAULT_MIN_MOTION),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PITCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("PITCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.kind = backend
                    .parse::<BackendKind>()
                    .map_err(|e| anyhow!("PITCH_BACKEND: {}", e))?;
            }
        }
        if let Ok(path) = std::env::var("PITCH_VIDEO_PATH") {
            if !path.trim().is_empty() {
                self.video_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("PITCH_OUTPUT_PATH") {
            if !path.trim().is_empty() {
                self.output_path = PathBuf::from(path);
            }
        }
        if let Ok(velocity) = std::env::var("PITCH_VELOCITY_MPH") {
            self.velocity_mph = velocity
                .trim()
                .parse()
                .map_err(|_| anyhow!("PITCH_VELOCITY_MPH must be a number"))?;
        }
        if let Ok(frame) = std::env::var("PITCH_RELEASE_FRAME") {
            let frame: i64 = frame
                .trim()
                .parse()
                .map_err(|_| anyhow!("PITCH_RELEASE_FRAME must be an integer"))?;
            self.release_frame = release_from_signed(frame);
        }
        if let Ok(confidence) = std::env::var("PITCH_CONFIDENCE") {
            self.confidence_threshold = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("PITCH_CONFIDENCE must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..SCAN_CONFIDENCE).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "aggregation confidence threshold must be within [0, {}), got {}",
                SCAN_CONFIDENCE,
                self.confidence_threshold
            ));
        }
        if !self.velocity_mph.is_finite() || self.velocity_mph <= 0.0 {
            return Err(anyhow!("pitch velocity must be greater than zero"));
        }
        if !self.flight.fps.is_finite() || self.flight.fps <= 0.0 {
            return Err(anyhow!("video fps must be greater than zero"));
        }
        if !self.flight.release_distance_ft.is_finite() || self.flight.release_distance_ft <= 0.0 {
            return Err(anyhow!("release distance must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.nms_iou) {
            return Err(anyhow!("NMS IoU threshold must be within [0, 1]"));
        }
        if self.min_release_motion < 0.0 {
            return Err(anyhow!("release motion threshold must not be negative"));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: BackendSettings {
                kind: DEFAULT_BACKEND,
                model_path: PathBuf::from(DEFAULT_MODEL_PATH),
                input_size: DEFAULT_INPUT_SIZE,
                nms_iou: DEFAULT_NMS_IOU,
            },
            confidence_threshold: AGGREGATION_CONFIDENCE,
            pitch_name: DEFAULT_PITCH_NAME.to_string(),
            video_path: video_path_for(
                DEFAULT_PITCH_NAME,
                Path::new(DEFAULT_VIDEOS_DIR),
                DEFAULT_VIDEO_EXTENSION,
            ),
            output_path: csv_path_for(
                DEFAULT_PITCH_NAME,
                Path::new(DEFAULT_CSV_DIR),
                DEFAULT_PREDICTOR_SUFFIX,
            ),
            velocity_mph: DEFAULT_VELOCITY_MPH,
            release_frame: None,
            flight: FlightTimeModel::default(),
            min_release_motion: DEFAULT_MIN_MOTION,
        }
    }
}

/// `<videos_dir>/<name>.<extension>`
pub fn video_path_for(name: &str, videos_dir: &Path, extension: &str) -> PathBuf {
    videos_dir.join(format!("{}.{}", name, extension))
}

/// `<csv_dir>/<name><suffix>.csv`
pub fn csv_path_for(name: &str, csv_dir: &Path, suffix: &str) -> PathBuf {
    csv_dir.join(format!("{}{}.csv", name, suffix))
}

/// Negative release frames mean "unknown".
fn release_from_signed(frame: i64) -> Option<u64> {
    u64::try_from(frame).ok()
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
