//! pitch_predict - export ball detections for the configured pitch video
//!
//! Loads the detector, finds the frame-of-interest window (release frame
//! through the ball reaching the plate), runs the detector on each frame in
//! the window and writes `frame,box_num,x1,y1,x2,y2,confidence` rows sorted
//! by frame. Settings come from the TOML file named by `--config` /
//! `PITCH_CONFIG` plus `PITCH_*` environment overrides.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use pitch_detect::{PipelineConfig, Runner};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a TOML run configuration.
    #[arg(long, env = "PITCH_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    /// UI mode for stderr progress.
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto, value_name = "MODE")]
    ui: ui::UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(args.ui);

    let cfg = {
        let stage = ui.stage("Load configuration");
        let cfg =
            PipelineConfig::load_from(args.config.as_deref()).context("load run configuration")?;
        stage.finish();
        cfg
    };
    log::info!(
        "pitch={} video={} model={} ({})",
        cfg.pitch_name,
        cfg.video_path.display(),
        cfg.detector.model_path.display(),
        cfg.detector.kind
    );

    let mut runner = Runner::new(cfg);
    let report = {
        let stage = ui.stage("Detect pitch boxes");
        let report = runner.run()?;
        stage.finish();
        report
    };

    println!(
        "{} rows written to {} (window {}, {} frames analyzed)",
        report.rows,
        report.output.display(),
        report.window,
        report.frames_analyzed
    );
    Ok(())
}
