//! Shared template library for the template classifier.
//!
//! Provides a thread-safe [`TemplateStore`] that a classifier reads on every
//! stroke while the feedback store appends newly learned templates to it.

use std::f64::consts::TAU;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::ShapeKind;
use crate::error::StrokeResult;
use crate::geometry::Point;
use crate::normalize::{normalize, RESAMPLE_POINTS};

/// A normalized reference stroke for one shape label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Shape this template stands for.
    pub label: ShapeKind,
    /// Normalized points, [`RESAMPLE_POINTS`] long.
    pub points: Vec<Point>,
}

impl Template {
    /// Wrap already normalized points.
    #[must_use]
    pub fn new(label: ShapeKind, points: Vec<Point>) -> Self {
        Self { label, points }
    }

    /// Normalize a raw stroke into a template.
    #[must_use]
    pub fn from_stroke(label: ShapeKind, stroke: &[Point]) -> Self {
        Self::new(label, normalize(stroke, RESAMPLE_POINTS))
    }
}

/// Thread-safe, cheaply clonable template library.
///
/// Clones share the same underlying list.
///
/// # Example
///
/// ```
/// use shapesnap_core::{ShapeKind, TemplateStore};
///
/// let store = TemplateStore::with_defaults();
/// assert_eq!(store.count(ShapeKind::Circle), 1);
///
/// let learner = store.clone();
/// learner.clear();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Arc<RwLock<Vec<Template>>>,
}

impl TemplateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with one template per primitive.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            templates: Arc::new(RwLock::new(default_templates())),
        }
    }

    /// Append a template.
    pub fn add(&self, template: Template) {
        debug!(label = %template.label, "adding template");
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(template);
    }

    /// Normalize a raw stroke and append it under `label`.
    pub fn add_stroke(&self, label: ShapeKind, stroke: &[Point]) {
        self.add(Template::from_stroke(label, stroke));
    }

    /// Snapshot of all templates.
    #[must_use]
    pub fn templates(&self) -> Vec<Template> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of templates with the given label.
    #[must_use]
    pub fn count(&self, label: ShapeKind) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.label == label)
            .count()
    }

    /// Total number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every template.
    pub fn clear(&self) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop learned templates and restore the defaults.
    pub fn reset_to_defaults(&self) {
        *self.templates.write().unwrap_or_else(PoisonError::into_inner) = default_templates();
    }

    /// Serialize all templates to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StrokeResult<String> {
        Ok(serde_json::to_string(&self.templates())?)
    }

    /// Build a store from JSON produced by [`TemplateStore::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a template list.
    pub fn from_json(json: &str) -> StrokeResult<Self> {
        let templates: Vec<Template> = serde_json::from_str(json)?;
        Ok(Self {
            templates: Arc::new(RwLock::new(templates)),
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn ellipse_ring(rx: f64, ry: f64) -> Vec<Point> {
    (0..=RESAMPLE_POINTS)
        .map(|i| {
            let t = TAU * i as f64 / RESAMPLE_POINTS as f64;
            Point::new(rx * t.cos(), ry * t.sin())
        })
        .collect()
}

fn polygon_ring(corners: &[Point]) -> Vec<Point> {
    let mut ring = corners.to_vec();
    if let Some(&first) = corners.first() {
        ring.push(first);
    }
    ring
}

fn default_templates() -> Vec<Template> {
    let triangle: Vec<Point> = [90.0_f64, 210.0, 330.0]
        .iter()
        .map(|deg| {
            let t = deg.to_radians();
            Point::new(100.0 * t.cos(), 100.0 * t.sin())
        })
        .collect();
    vec![
        Template::from_stroke(ShapeKind::Circle, &ellipse_ring(100.0, 100.0)),
        Template::from_stroke(ShapeKind::Oval, &ellipse_ring(100.0, 60.0)),
        Template::from_stroke(
            ShapeKind::Square,
            &polygon_ring(&[
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
                Point::new(0.0, 100.0),
            ]),
        ),
        Template::from_stroke(
            ShapeKind::Rectangle,
            &polygon_ring(&[
                Point::new(0.0, 0.0),
                Point::new(200.0, 0.0),
                Point::new(200.0, 100.0),
                Point::new(0.0, 100.0),
            ]),
        ),
        Template::from_stroke(ShapeKind::Triangle, &polygon_ring(&triangle)),
        Template::from_stroke(
            ShapeKind::Line,
            &[Point::new(0.0, 0.0), Point::new(250.0, 0.0)],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_one_per_primitive() {
        let store = TemplateStore::with_defaults();
        assert_eq!(store.len(), ShapeKind::ALL.len());
        for kind in ShapeKind::ALL {
            assert_eq!(store.count(kind), 1, "{kind}");
        }
        assert_eq!(store.count(ShapeKind::None), 0);
    }

    #[test]
    fn test_templates_are_normalized() {
        for template in TemplateStore::with_defaults().templates() {
            assert_eq!(template.points.len(), RESAMPLE_POINTS);
        }
    }

    #[test]
    fn test_add_and_reset() {
        let store = TemplateStore::with_defaults();
        store.add_stroke(ShapeKind::Square, &[Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
        assert_eq!(store.count(ShapeKind::Square), 2);
        store.reset_to_defaults();
        assert_eq!(store.count(ShapeKind::Square), 1);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = TemplateStore::new();
        let other = store.clone();
        other.add(Template::new(ShapeKind::Line, vec![Point::default(); RESAMPLE_POINTS]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let store = TemplateStore::with_defaults();
        let json = store.to_json().expect("serialize");
        let restored = TemplateStore::from_json(&json).expect("deserialize");
        let (before, after) = (store.templates(), restored.templates());
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(a.label, b.label);
            assert!(a.points.iter().zip(&b.points).all(|(p, q)| p.distance_to(*q) < 1e-9));
        }
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(TemplateStore::from_json("{\"not\":\"templates\"}").is_err());
    }
}
