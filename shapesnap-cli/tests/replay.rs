//! Stroke Replay Tests
//!
//! Runs the CLI pipeline against stroke files on disk:
//! - Both point encodings
//! - Every strategy on the same stroke
//! - Config and template files
//! - Error reporting for bad input

use std::f64::consts::TAU;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use shapesnap_cli::{load_stroke, replay_stroke, run, CliArgs};
use shapesnap_core::{ClassifierKind, DetectorConfig, IdealizedShape, Point, ShapeKind, TemplateStore};
use tempfile::{NamedTempFile, TempDir};

/// Write `contents` to a new file in `dir`.
fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write file");
    path
}

fn circle_json(radius: f64) -> String {
    let points: Vec<String> = (0..64)
        .map(|i| {
            let t = TAU * f64::from(i) / 64.0;
            format!("[{:.3}, {:.3}]", 200.0 + radius * t.cos(), 200.0 + radius * t.sin())
        })
        .collect();
    format!("[{}]", points.join(","))
}

fn line_json() -> String {
    let points: Vec<String> = (0..15)
        .map(|i| format!(r#"{{"x": {}, "y": 40}}"#, i * 10))
        .collect();
    format!("[{}]", points.join(","))
}

fn parse(argv: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("shapesnap").chain(argv.iter().copied())).expect("arguments")
}

// ============================================================================
// Loading Tests
// ============================================================================

#[test]
fn test_load_stroke_from_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "[[0, 0], {{\"x\": 5, \"y\": 5}}, [10, 0]]").expect("write");
    let stroke = load_stroke(file.path()).expect("stroke");
    assert_eq!(stroke.len(), 3);
    assert_eq!(stroke[1], Point::new(5.0, 5.0));
}

#[test]
fn test_missing_file_names_path() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("nope.json");
    let err = load_stroke(&missing).expect_err("missing");
    assert!(format!("{err:#}").contains("nope.json"));
}

// ============================================================================
// Replay Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_replay_commits_circle() {
    let stroke: Vec<Point> = shapesnap_cli::parse_stroke(&circle_json(75.0)).expect("stroke");
    let report = replay_stroke(DetectorConfig::default(), TemplateStore::with_defaults(), &stroke)
        .await
        .expect("replay");
    assert_eq!(report.kind, ShapeKind::Circle);
    assert_eq!(report.points, 64);
    assert!(matches!(report.shape, Some(IdealizedShape::Circle { radius, .. }) if (radius - 75.0).abs() < 2.0));
}

#[tokio::test(start_paused = true)]
async fn test_run_all_strategies() {
    let dir = TempDir::new().expect("temp dir");
    let circle = write_file(&dir, "circle.json", &circle_json(90.0));
    let line = write_file(&dir, "line.json", &line_json());
    let args = parse(&[
        "--all-strategies",
        circle.to_str().expect("utf8 path"),
        line.to_str().expect("utf8 path"),
    ]);

    let reports = run(&args).await.expect("run");
    assert_eq!(reports.len(), 6);
    let strategies: Vec<ClassifierKind> = reports.iter().take(3).map(|r| r.strategy).collect();
    assert_eq!(strategies, ClassifierKind::ALL.to_vec());
    assert!(reports[..3].iter().all(|r| r.kind == ShapeKind::Circle));
    assert!(reports[3..].iter().all(|r| r.kind == ShapeKind::Line));
    assert_eq!(reports[3].file.as_deref(), Some(line.as_path()));
}

#[tokio::test(start_paused = true)]
async fn test_high_threshold_from_config_file_suppresses_preview() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_file(&dir, "config.json", r#"{"min_preview_confidence": 1.0, "hold_delay_ms": 50}"#);
    let stroke = write_file(&dir, "circle.json", &circle_json(60.0));
    let args = parse(&["--config", config.to_str().expect("utf8"), stroke.to_str().expect("utf8")]);

    let reports = run(&args).await.expect("run");
    assert_eq!(reports[0].kind, ShapeKind::None);
    assert!(reports[0].shape.is_none());
    assert!(reports[0].confidence > 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_empty_template_library() {
    let dir = TempDir::new().expect("temp dir");
    let templates = write_file(&dir, "templates.json", "[]");
    let stroke = write_file(&dir, "circle.json", &circle_json(60.0));
    let args = parse(&[
        "--strategy",
        "template",
        "--templates",
        templates.to_str().expect("utf8"),
        stroke.to_str().expect("utf8"),
    ]);

    let reports = run(&args).await.expect("run");
    assert_eq!(reports[0].kind, ShapeKind::None);
}

#[tokio::test]
async fn test_bad_stroke_file_fails_run() {
    let dir = TempDir::new().expect("temp dir");
    let stroke = write_file(&dir, "bad.json", r#"{"not": "a stroke"}"#);
    let args = parse(&[stroke.to_str().expect("utf8")]);
    let err = run(&args).await.expect_err("bad file");
    assert!(format!("{err:#}").contains("bad.json"));
}
