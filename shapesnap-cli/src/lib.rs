//! # Shapesnap CLI
//!
//! A minimal host for `shapesnap-core`. Each stroke file is replayed through
//! a real detection session: pointer events, hold timer, preview, commit.
//!
//! ## Usage
//!
//! ```bash
//! shapesnap circle.json
//! shapesnap --strategy template --templates learned.json square.json
//! shapesnap --all-strategies --json scribble.json
//! ```
//!
//! Stroke files hold a JSON array of points, either `{"x": 1.0, "y": 2.0}`
//! objects or `[1.0, 2.0]` pairs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use serde::{Deserialize, Serialize};
use shapesnap_core::{
    ClassificationResult, ClassifierKind, DetectorConfig, IdealizedShape, Point, PointerEvent,
    SessionController, ShapeKind, TemplateStore, TokioScheduler,
};
use tracing::{debug, info};

/// Milliseconds between replayed pointer samples.
const SAMPLE_INTERVAL_MS: u64 = 16;

/// Command-line arguments for shapesnap.
#[derive(Debug, Clone, Parser)]
#[command(name = "shapesnap")]
#[command(about = "Recognize recorded freehand strokes as geometric shapes")]
#[command(version)]
pub struct CliArgs {
    /// Stroke files to recognize
    #[arg(required = true)]
    pub strokes: Vec<PathBuf>,

    /// Classifier strategy (rules, hull, template)
    #[arg(long, env = "SHAPESNAP_STRATEGY")]
    pub strategy: Option<String>,

    /// Hold delay before a stroke is classified
    #[arg(long, env = "SHAPESNAP_HOLD_DELAY_MS")]
    pub hold_delay_ms: Option<u64>,

    /// Minimum confidence for a preview to be offered
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// JSON detector configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON template library (defaults to the built-in templates)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Print reports as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Run every strategy on each stroke
    #[arg(long)]
    pub all_strategies: bool,
}

impl TryFrom<&CliArgs> for DetectorConfig {
    type Error = anyhow::Error;

    /// The config file (if any) is loaded first, then flags override it.
    fn try_from(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                DetectorConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => DetectorConfig::default(),
        };
        if let Some(strategy) = &args.strategy {
            config.strategy = strategy.parse()?;
        }
        if let Some(delay) = args.hold_delay_ms {
            config.hold_delay_ms = delay;
        }
        if let Some(min) = args.min_confidence {
            config.min_preview_confidence = min;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrokePoint {
    Object { x: f64, y: f64 },
    Pair([f64; 2]),
}

impl From<StrokePoint> for Point {
    fn from(p: StrokePoint) -> Self {
        match p {
            StrokePoint::Object { x, y } => Point::new(x, y),
            StrokePoint::Pair([x, y]) => Point::new(x, y),
        }
    }
}

/// Parse a stroke from JSON text.
///
/// # Errors
///
/// Fails on malformed JSON, non-finite coordinates, or an empty stroke.
pub fn parse_stroke(json: &str) -> anyhow::Result<Vec<Point>> {
    let raw: Vec<StrokePoint> = serde_json::from_str(json).context("stroke is not a JSON point array")?;
    let points: Vec<Point> = raw.into_iter().map(Point::from).collect();
    if points.is_empty() {
        bail!("stroke has no points");
    }
    if let Some(bad) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        bail!("stroke has a non-finite point ({}, {})", bad.x, bad.y);
    }
    Ok(points)
}

/// Load a stroke file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold a valid stroke.
pub fn load_stroke(path: &Path) -> anyhow::Result<Vec<Point>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading stroke {}", path.display()))?;
    parse_stroke(&json).with_context(|| format!("loading stroke {}", path.display()))
}

/// Load a template library, or the built-in one when no path is given.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_templates(path: Option<&Path>) -> anyhow::Result<TemplateStore> {
    let Some(path) = path else {
        return Ok(TemplateStore::with_defaults());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading templates {}", path.display()))?;
    let store = TemplateStore::from_json(&json).with_context(|| format!("parsing templates {}", path.display()))?;
    info!(path = %path.display(), templates = store.len(), "loaded template library");
    Ok(store)
}

/// Outcome of replaying one stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeReport {
    /// Source file, if the stroke came from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Strategy that classified the stroke.
    pub strategy: ClassifierKind,
    /// Recognized kind (`none` if no preview was offered).
    pub kind: ShapeKind,
    /// Classifier confidence, reported even when below the preview threshold.
    pub confidence: f64,
    /// Committed shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<IdealizedShape>,
    /// Number of raw points in the stroke.
    pub points: usize,
}

impl StrokeReport {
    /// One-line human-readable summary.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = String::new();
        if let Some(file) = &self.file {
            let _ = write!(line, "{}: ", file.display());
        }
        let _ = write!(
            line,
            "[{}] {} ({:.2}, {} points)",
            self.strategy, self.kind, self.confidence, self.points
        );
        match &self.shape {
            Some(IdealizedShape::Circle { center, radius }) => {
                let _ = write!(line, " center=({:.1}, {:.1}) r={radius:.1}", center.x, center.y);
            }
            Some(
                IdealizedShape::Oval { center, width, height }
                | IdealizedShape::Square { center, width, height }
                | IdealizedShape::Rectangle { center, width, height },
            ) => {
                let _ = write!(line, " center=({:.1}, {:.1}) {width:.1}x{height:.1}", center.x, center.y);
            }
            Some(IdealizedShape::Triangle { points }) => {
                for p in points {
                    let _ = write!(line, " ({:.1}, {:.1})", p.x, p.y);
                }
            }
            Some(IdealizedShape::Line { points: [a, b] }) => {
                let _ = write!(line, " ({:.1}, {:.1}) -> ({:.1}, {:.1})", a.x, a.y, b.x, b.y);
            }
            None => {}
        }
        line
    }
}

/// Replay `stroke` through a detection session on the Tokio runtime.
///
/// Waits out the configured hold delay, then commits the preview if one is
/// offered.
///
/// # Errors
///
/// Fails if the configuration is invalid or the session rejects an event.
pub async fn replay_stroke(
    config: DetectorConfig,
    templates: TemplateStore,
    stroke: &[Point],
) -> anyhow::Result<StrokeReport> {
    let strategy = config.strategy;
    let (scheduler, mut fired) = TokioScheduler::channel();
    let mut session = SessionController::new(config, templates, Box::new(scheduler))?;

    let mut armed = None;
    for event in PointerEvent::from_stroke(stroke, SAMPLE_INTERVAL_MS) {
        armed = session.process_event(&event)?.or(armed);
    }
    let Some(armed) = armed else {
        bail!("stroke produced no pointer events");
    };

    while let Some(ticket) = fired.recv().await {
        if ticket == armed {
            break;
        }
    }
    let preview = session.on_timer(armed);
    let result = session.last_result().unwrap_or_else(ClassificationResult::none);
    debug!(session = %session.session_id(), kind = ?result.kind, confidence = result.confidence, "stroke replayed");

    let shape = match preview {
        Some(_) => Some(session.apply_shape()?.shape),
        None => None,
    };
    Ok(StrokeReport {
        file: None,
        strategy,
        kind: shape.as_ref().map_or(ShapeKind::None, IdealizedShape::kind),
        confidence: result.confidence,
        shape,
        points: stroke.len(),
    })
}

/// Recognize every stroke file named in `args`.
///
/// # Errors
///
/// Fails on the first unreadable file or invalid setting.
pub async fn run(args: &CliArgs) -> anyhow::Result<Vec<StrokeReport>> {
    let base = DetectorConfig::try_from(args)?;
    let templates = load_templates(args.templates.as_deref())?;
    let strategies = if args.all_strategies {
        ClassifierKind::ALL.to_vec()
    } else {
        vec![base.strategy]
    };

    let mut reports = Vec::with_capacity(args.strokes.len() * strategies.len());
    for path in &args.strokes {
        let stroke = load_stroke(path)?;
        for &strategy in &strategies {
            let config = DetectorConfig {
                strategy,
                ..base.clone()
            };
            let mut report = replay_stroke(config, templates.clone(), &stroke).await?;
            report.file = Some(path.clone());
            info!(file = %path.display(), strategy = %strategy, kind = %report.kind, "recognized");
            reports.push(report);
        }
    }
    Ok(reports)
}
