//! pitch_scan - run the ball detector over every frame of a video
//!
//! Unlike `pitch_predict` there is no frame-of-interest window: every decoded
//! frame is analyzed at a user-facing confidence threshold. The output table
//! has the same columns as `pitch_predict`.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use pitch_detect::{
    collect_detections, load_backend, BackendKind, BackendSettings, DetectionTable, FileSource,
    FrameWindow, SCAN_CONFIDENCE,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video to scan (local file or stub:// synthetic video).
    video: PathBuf,
    /// Path to the detector model.
    #[arg(long, env = "PITCH_MODEL_PATH", default_value = "runs/detect/pitch_detection_v5/weights/best.onnx")]
    model: PathBuf,
    /// Detector backend (tract|stub).
    #[arg(long, default_value = "tract")]
    backend: BackendKind,
    /// Minimum box confidence.
    #[arg(long, default_value_t = SCAN_CONFIDENCE)]
    conf: f32,
    /// Square model input size.
    #[arg(long, default_value_t = 640)]
    input_size: u32,
    /// NMS IoU threshold.
    #[arg(long, default_value_t = 0.7)]
    nms_iou: f32,
    /// Output CSV path (defaults to <video stem>_scan.csv).
    #[arg(long)]
    output: Option<PathBuf>,
    /// UI mode for stderr progress.
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto, value_name = "MODE")]
    ui: ui::UiMode,
}

fn default_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.split('?').next().unwrap_or(stem))
        .filter(|stem| !stem.is_empty())
        .unwrap_or("video");
    PathBuf::from(format!("{stem}_scan.csv"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(args.ui);
    if !(0.0..=1.0).contains(&args.conf) {
        anyhow::bail!("--conf must be within [0, 1]");
    }
    let output = args.output.clone().unwrap_or_else(|| default_output(&args.video));

    let settings = BackendSettings {
        kind: args.backend,
        model_path: args.model.clone(),
        input_size: args.input_size,
        nms_iou: args.nms_iou,
    };
    let mut detector = {
        let stage = ui.stage("Load detector");
        let backend = load_backend(&settings)?;
        stage.finish();
        backend
    };

    let aggregation = {
        let stage = ui.stage("Scan video");
        let mut source = FileSource::open(&args.video)?;
        let aggregation = collect_detections(
            &mut source,
            detector.as_mut(),
            FrameWindow::unbounded(),
            args.conf,
        )?;
        stage.finish();
        aggregation
    };

    let table = DetectionTable::from_records(aggregation.detections);
    {
        let stage = ui.stage("Write table");
        table.write_csv(&output)?;
        stage.finish();
    }

    println!(
        "{} rows from {} frames written to {}",
        table.len(),
        aggregation.frames_analyzed,
        output.display()
    );
    Ok(())
}
