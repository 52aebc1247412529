//! End-to-end runs from a config file on disk.

use std::fs;
use std::path::Path;

use spray_orchestrator::sink::{frame_file_name, MANIFEST_FILE};
use spray_orchestrator::{
    create_runner, run_config, DirectorySink, Error, Manifest, MemorySink, RunnerState,
};

const SMALL: &str = r#"{
    "name": "small",
    "simulation": {
        "wall": { "width": 0.5, "height": 0.25 },
        "raster": { "pass_speed": 1.0, "frame_rate": 16.0 },
        "arm": { "base": [0.25, -0.1], "link_lengths": [0.4, 0.35] },
        "emit_per_step": 300,
        "intensity": { "base": 0.5 },
        "texture": { "width": 32, "height": 32, "coverage_threshold": 0.3 }
    },
    "output": { "save_every": 5 }
}"#;

fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("small.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_run_config_into_memory() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(tmp.path(), SMALL);

    let mut sink = MemorySink::default();
    let summary = run_config(&path, &mut sink).unwrap();

    // 0.5 m at 1/16 m per step is 8 steps per row, 2 rows of 0.15 m pitch
    assert_eq!(summary.steps, 16);
    assert_eq!(sink.poses.len(), 16);
    let steps: Vec<usize> = sink.frames.iter().map(|f| f.step).collect();
    assert_eq!(steps, vec![0, 5, 10, 15]);

    // Coverage never decreases along the run
    for pair in sink.poses.windows(2) {
        assert!(pair[1].coverage_percent >= pair[0].coverage_percent);
    }
    assert!(summary.final_coverage_percent > 0.0);
    assert!(sink.poses.iter().all(|p| !p.clamped));
}

#[test]
fn test_directory_sink_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(tmp.path(), SMALL);
    let out = tmp.path().join("frames");

    let mut sink = DirectorySink::create(&out, "small").unwrap();
    let summary = run_config(&path, &mut sink).unwrap();

    let manifest = Manifest::load(out.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.summary, summary);
    assert_eq!(manifest.poses.len(), summary.steps);
    assert_eq!(manifest.frames.len(), summary.frames);
    assert_eq!((manifest.width, manifest.height), (32, 32));
    for (i, record) in manifest.frames.iter().enumerate() {
        assert_eq!(record.file, frame_file_name(i));
        assert!(out.join(&record.file).exists());
    }
}

#[test]
fn test_unreachable_wall_is_rejected_before_running() {
    let tmp = tempfile::tempdir().unwrap();
    let json = SMALL.replace("[0.4, 0.35]", "[0.1, 0.1]");
    let path = write_config(tmp.path(), &json);

    let mut sink = MemorySink::default();
    let err = run_config(&path, &mut sink).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
    assert!(sink.poses.is_empty());
}

#[test]
fn test_missing_config_is_io_error() {
    let mut sink = MemorySink::default();
    let err = run_config("/nonexistent/spray.json", &mut sink).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_background_runner_writes_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_config(tmp.path(), SMALL);
    let out = tmp.path().join("bg");

    let runner = create_runner(&path, Some(out.as_path())).unwrap();
    assert_eq!(runner.state(), RunnerState::Created);
    runner.start();
    let summary = runner.join().unwrap();

    assert_eq!(summary.steps, 16);
    assert!(out.join(MANIFEST_FILE).exists());
    assert!(out.join(frame_file_name(0)).exists());
}
