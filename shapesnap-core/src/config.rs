//! Detector configuration.
//!
//! Every empirically tuned threshold lives here so it can be calibrated
//! against a labelled stroke corpus without touching classifier code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierKind;
use crate::error::{StrokeError, StrokeResult};

/// Top-level configuration for a detection session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Which classifier runs when the hold timer fires.
    pub strategy: ClassifierKind,
    /// Debounce between the end of a stroke and classification.
    pub hold_delay_ms: u64,
    /// Classifications at or below this confidence produce no preview.
    pub min_preview_confidence: f64,
    /// Tuning for the rule-based classifier.
    pub rules: RuleThresholds,
    /// Tuning for the template classifier.
    pub template: TemplateTuning,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: ClassifierKind::default(),
            hold_delay_ms: 500,
            min_preview_confidence: 0.2,
            rules: RuleThresholds::default(),
            template: TemplateTuning::default(),
        }
    }
}

impl DetectorConfig {
    /// Default configuration with a different strategy.
    #[must_use]
    pub fn with_strategy(strategy: ClassifierKind) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// The hold delay as a [`Duration`].
    #[must_use]
    pub fn hold_delay(&self) -> Duration {
        Duration::from_millis(self.hold_delay_ms)
    }

    /// Parse a configuration from JSON, validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, names an unknown strategy,
    /// or holds out-of-range values.
    pub fn from_json(json: &str) -> StrokeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> StrokeResult<()> {
        unit("min_preview_confidence", self.min_preview_confidence)?;
        self.rules.validate()?;
        self.template.validate()
    }
}

/// Thresholds of the rule-based classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Average chord deviation (px) at which line confidence reaches zero.
    pub line_max_deviation: f64,
    /// Minimum line confidence to accept an open stroke as a line.
    pub line_min_confidence: f64,
    /// Minimum combined circle score.
    pub circle_min_score: f64,
    /// Minimum aspect ratio for a circle or oval.
    pub circle_min_aspect: f64,
    /// Aspect ratio above which a round shape is a circle rather than an oval.
    pub circle_aspect_split: f64,
    /// Minimum combined quadrilateral score.
    pub quad_min_score: f64,
    /// Distance to an edge that counts as covered, relative to the shape size.
    pub edge_tolerance: f64,
    /// Fraction of points that must lie near a quadrilateral edge.
    pub quad_min_coverage: f64,
    /// Aspect ratio above which a quadrilateral is a square.
    pub square_aspect_split: f64,
    /// Fraction of points that must lie near a triangle edge.
    pub triangle_min_coverage: f64,
    /// Turning angle (degrees) a sharp triangle corner must exceed.
    pub triangle_corner_turn_deg: f64,
    /// Quadrilateral and circle both above this: prefer the quadrilateral.
    pub quad_over_circle: f64,
    /// Triangle above this: prefer it over a winning circle.
    pub triangle_over_circle: f64,
    /// More self-intersections than this damp closed-shape scores.
    pub max_self_intersections: usize,
    /// Multiplier applied to closed-shape scores of self-intersecting strokes.
    pub self_intersection_damping: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            line_max_deviation: 20.0,
            line_min_confidence: 0.6,
            circle_min_score: 0.75,
            circle_min_aspect: 0.6,
            circle_aspect_split: 0.85,
            quad_min_score: 0.6,
            edge_tolerance: 0.08,
            quad_min_coverage: 0.75,
            square_aspect_split: 0.7,
            triangle_min_coverage: 0.8,
            triangle_corner_turn_deg: 45.0,
            quad_over_circle: 0.7,
            triangle_over_circle: 0.2,
            max_self_intersections: 2,
            self_intersection_damping: 0.6,
        }
    }
}

impl RuleThresholds {
    fn validate(&self) -> StrokeResult<()> {
        positive("rules.line_max_deviation", self.line_max_deviation)?;
        positive("rules.triangle_corner_turn_deg", self.triangle_corner_turn_deg)?;
        for (name, value) in [
            ("rules.line_min_confidence", self.line_min_confidence),
            ("rules.circle_min_score", self.circle_min_score),
            ("rules.circle_min_aspect", self.circle_min_aspect),
            ("rules.circle_aspect_split", self.circle_aspect_split),
            ("rules.quad_min_score", self.quad_min_score),
            ("rules.edge_tolerance", self.edge_tolerance),
            ("rules.quad_min_coverage", self.quad_min_coverage),
            ("rules.square_aspect_split", self.square_aspect_split),
            ("rules.triangle_min_coverage", self.triangle_min_coverage),
            ("rules.quad_over_circle", self.quad_over_circle),
            ("rules.triangle_over_circle", self.triangle_over_circle),
            ("rules.self_intersection_damping", self.self_intersection_damping),
        ] {
            unit(name, value)?;
        }
        Ok(())
    }
}

/// Tuning of the template classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateTuning {
    /// Refine the rotation by golden-section search before measuring distance.
    pub angle_search: bool,
    /// Half-width of the rotation search window, in degrees.
    pub angle_range_deg: f64,
    /// Search stops once the window is narrower than this, in degrees.
    pub angle_precision_deg: f64,
    /// Best corrected score below this yields no shape.
    pub min_score: f64,
    /// Multiplier for closed kinds when the stroke is left open. Small enough
    /// that the largest corner boost keeps an open stroke under the default
    /// preview threshold.
    pub open_stroke_penalty: f64,
}

impl Default for TemplateTuning {
    fn default() -> Self {
        Self {
            angle_search: true,
            angle_range_deg: 45.0,
            angle_precision_deg: 2.0,
            min_score: 0.1,
            open_stroke_penalty: 0.15,
        }
    }
}

impl TemplateTuning {
    fn validate(&self) -> StrokeResult<()> {
        positive("template.angle_range_deg", self.angle_range_deg)?;
        positive("template.angle_precision_deg", self.angle_precision_deg)?;
        unit("template.min_score", self.min_score)?;
        unit("template.open_stroke_penalty", self.open_stroke_penalty)
    }
}

fn unit(name: &str, value: f64) -> StrokeResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(StrokeError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn positive(name: &str, value: f64) -> StrokeResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StrokeError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.strategy, ClassifierKind::Rules);
        assert_eq!(config.hold_delay(), Duration::from_millis(500));
        assert!((config.min_preview_confidence - 0.2).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = DetectorConfig::from_json(r#"{"strategy":"hull","hold_delay_ms":250}"#)
            .expect("valid config");
        assert_eq!(config.strategy, ClassifierKind::HullRatio);
        assert_eq!(config.hold_delay_ms, 250);
        assert_eq!(config.rules, RuleThresholds::default());
    }

    #[test]
    fn test_unknown_strategy_in_json() {
        let err = DetectorConfig::from_json(r#"{"strategy":"neural"}"#).unwrap_err();
        assert!(matches!(err, StrokeError::Serialization(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = DetectorConfig::default();
        config.min_preview_confidence = 1.5;
        assert!(matches!(config.validate(), Err(StrokeError::InvalidConfig(_))));

        let mut config = DetectorConfig::default();
        config.rules.line_max_deviation = f64::NAN;
        assert!(matches!(config.validate(), Err(StrokeError::InvalidConfig(_))));

        let mut config = DetectorConfig::default();
        config.template.angle_precision_deg = 0.0;
        assert!(matches!(config.validate(), Err(StrokeError::InvalidConfig(_))));

        let mut config = DetectorConfig::default();
        config.template.open_stroke_penalty = 1.2;
        assert!(matches!(config.validate(), Err(StrokeError::InvalidConfig(_))));
    }

    #[test]
    fn test_roundtrip_json() {
        let config = DetectorConfig::with_strategy(ClassifierKind::Template);
        let json = serde_json::to_string(&config).expect("serialize");
        let back = DetectorConfig::from_json(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
