use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use pitch_detect::{BackendKind, PipelineConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PITCH_CONFIG",
        "PITCH_MODEL_PATH",
        "PITCH_BACKEND",
        "PITCH_VIDEO_PATH",
        "PITCH_OUTPUT_PATH",
        "PITCH_VELOCITY_MPH",
        "PITCH_RELEASE_FRAME",
        "PITCH_CONFIDENCE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [model]
        path = "models/pitch_v7.onnx"
        backend = "tract"
        input_size = 416
        nms_iou = 0.5

        [pitch]
        name = "cole3"
        videos_dir = "clips"
        velocity_mph = 97.2
        release_frame = 44

        [output]
        csv_dir = "tables"
        predictor_suffix = "_boxes"

        [flight]
        fps = 60.0
        release_distance_ft = 54.0

        [release]
        min_motion = 0.5
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("PITCH_CONFIG", file.path());
    std::env::set_var("PITCH_BACKEND", "stub");
    std::env::set_var("PITCH_RELEASE_FRAME", "-1");
    std::env::set_var("PITCH_CONFIDENCE", "0.05");

    let cfg = PipelineConfig::load().expect("load config");

    assert_eq!(cfg.detector.model_path, PathBuf::from("models/pitch_v7.onnx"));
    assert_eq!(cfg.detector.kind, BackendKind::Stub);
    assert_eq!(cfg.detector.input_size, 416);
    assert_eq!(cfg.detector.nms_iou, 0.5);
    assert_eq!(cfg.pitch_name, "cole3");
    assert_eq!(cfg.video_path, PathBuf::from("clips/cole3.mp4"));
    assert_eq!(cfg.output_path, PathBuf::from("tables/cole3_boxes.csv"));
    assert_eq!(cfg.velocity_mph, 97.2);
    assert_eq!(cfg.release_frame, None);
    assert_eq!(cfg.confidence_threshold, 0.05);
    assert_eq!(cfg.flight.fps, 60.0);
    assert_eq!(cfg.flight.release_distance_ft, 54.0);
    assert_eq!(cfg.min_release_motion, 0.5);

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PITCH_VIDEO_PATH", "stub://pitch?frames=90&release=30");
    std::env::set_var("PITCH_RELEASE_FRAME", "12");

    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg.video_path, PathBuf::from("stub://pitch?frames=90&release=30"));
    assert_eq!(cfg.release_frame, Some(12));
    assert_eq!(cfg.output_path, PathBuf::from("csv/degrom1_predictor.csv"));
    assert_eq!(cfg.velocity_mph, 95.0);

    clear_env();
}

#[test]
fn rejects_invalid_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PITCH_VELOCITY_MPH", "fast");
    assert!(PipelineConfig::load().is_err());

    std::env::set_var("PITCH_VELOCITY_MPH", "-90");
    assert!(PipelineConfig::load().is_err());
    std::env::remove_var("PITCH_VELOCITY_MPH");

    std::env::set_var("PITCH_BACKEND", "darknet");
    assert!(PipelineConfig::load().is_err());
    std::env::remove_var("PITCH_BACKEND");

    // At or above the whole-video scan threshold.
    std::env::set_var("PITCH_CONFIDENCE", "0.9");
    assert!(PipelineConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PITCH_CONFIG", "/nonexistent/pitch.toml");
    assert!(PipelineConfig::load().is_err());

    clear_env();
}
