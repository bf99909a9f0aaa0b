//! # Classifiers
//!
//! Three interchangeable strategies that turn a raw stroke into a
//! [`ClassificationResult`]:
//!
//! - [`RuleClassifier`]: independent geometric detectors with tie-break rules
//! - [`HullClassifier`]: a decision tree over convex-hull ratios
//! - [`TemplateClassifier`]: nearest-template matching with fuzzy correction
//!
//! All three implement [`Classifier`], so a session only ever holds a
//! `Box<dyn Classifier>` chosen from [`ClassifierKind`] at construction time.

mod hull;
mod rules;
mod template;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use hull::HullClassifier;
pub use rules::RuleClassifier;
pub use template::TemplateClassifier;

use crate::config::DetectorConfig;
use crate::error::StrokeError;
use crate::geometry::Point;
use crate::templates::TemplateStore;

/// The primitive shapes a stroke can be recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// A round closed shape with equal axes.
    Circle,
    /// A round closed shape with unequal axes.
    Oval,
    /// A quadrilateral with equal sides.
    Square,
    /// A quadrilateral with unequal sides.
    Rectangle,
    /// A three-cornered closed shape.
    Triangle,
    /// An open straight stroke.
    Line,
    /// Nothing recognized.
    None,
}

impl ShapeKind {
    /// Every recognizable kind, excluding [`ShapeKind::None`].
    pub const ALL: [Self; 6] = [
        Self::Circle,
        Self::Oval,
        Self::Square,
        Self::Rectangle,
        Self::Triangle,
        Self::Line,
    ];

    /// Lowercase name, as used in JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Oval => "oval",
            Self::Square => "square",
            Self::Rectangle => "rectangle",
            Self::Triangle => "triangle",
            Self::Line => "line",
            Self::None => "none",
        }
    }

    /// Whether this kind describes a closed outline.
    #[must_use]
    pub fn is_closed(self) -> bool {
        !matches!(self, Self::Line | Self::None)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Recognized kind.
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl ClassificationResult {
    /// A result with its confidence clamped into `[0, 1]`.
    #[must_use]
    pub fn new(kind: ShapeKind, confidence: f64) -> Self {
        if kind == ShapeKind::None || !confidence.is_finite() {
            return Self::none();
        }
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// No shape recognized.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            kind: ShapeKind::None,
            confidence: 0.0,
        }
    }

    /// Whether a shape was recognized.
    #[must_use]
    pub fn is_shape(&self) -> bool {
        self.kind != ShapeKind::None
    }
}

/// A stroke classification strategy.
pub trait Classifier: Send + Sync {
    /// Classify a raw stroke. Never fails: unrecognizable input yields
    /// [`ClassificationResult::none`].
    fn classify(&self, points: &[Point]) -> ClassificationResult;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Selects one of the classifier strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierKind {
    /// Rule-based geometric detectors.
    #[default]
    #[serde(rename = "rules", alias = "rule-based", alias = "heuristic")]
    Rules,
    /// Convex-hull ratio decision tree.
    #[serde(rename = "hull", alias = "hull-ratio")]
    HullRatio,
    /// Template matching.
    #[serde(rename = "template", alias = "templates")]
    Template,
}

impl ClassifierKind {
    /// Every strategy, in a stable order.
    pub const ALL: [Self; 3] = [Self::Rules, Self::HullRatio, Self::Template];

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::HullRatio => "hull",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = StrokeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule-based" | "heuristic" => Ok(Self::Rules),
            "hull" | "hull-ratio" => Ok(Self::HullRatio),
            "template" | "templates" => Ok(Self::Template),
            _ => Err(StrokeError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Build the classifier `config` selects.
///
/// The template classifier reads `templates` on every call, so templates
/// learned later through feedback take effect immediately.
#[must_use]
pub fn build_classifier(config: &DetectorConfig, templates: TemplateStore) -> Box<dyn Classifier> {
    match config.strategy {
        ClassifierKind::Rules => Box::new(RuleClassifier::new(config.rules.clone())),
        ClassifierKind::HullRatio => Box::new(HullClassifier::new()),
        ClassifierKind::Template => {
            Box::new(TemplateClassifier::new(templates, config.template.clone()))
        }
    }
}
