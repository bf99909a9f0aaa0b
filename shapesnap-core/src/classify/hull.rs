//! Hull-ratio classifier: a decision tree over convex-hull measurements.

use std::f64::consts::PI;

use tracing::debug;

use super::{ClassificationResult, Classifier, ShapeKind};
use crate::features::{
    apply_virtual_closure, convex_hull, is_closed, min_area_rect, simplify, thinness_ratio,
};
use crate::fit::{fit_circle, fit_line};
use crate::geometry::{path_length, polygon_area, polygon_perimeter, triangle_area, Point, EPSILON};

const SIMPLIFY_EPSILON: f64 = 2.0;
const LINE_THINNESS: f64 = 100.0;
const ROUND_THINNESS: (f64, f64) = (12.5, 13.5);
const MIN_LINE_LENGTH: f64 = 20.0;
const CIRCLE_ASPECT: f64 = 0.85;
const OVAL_ASPECT: f64 = 0.6;
const TRIANGLE_RATIO: f64 = 0.8;
const RECTANGLE_RATIO: f64 = 0.9;
const SQUARE_ASPECT: f64 = 0.9;

/// Classifies by the thinness ratio of the convex hull and by how much of
/// the hull an inscribed triangle or enclosing rectangle accounts for.
#[derive(Debug, Clone, Copy, Default)]
pub struct HullClassifier;

impl HullClassifier {
    /// Create the classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn line(points: &[Point]) -> ClassificationResult {
        match fit_line(points) {
            Some(fit) if fit.length > MIN_LINE_LENGTH => {
                let confidence = 1.0 - 10.0 * fit.rms_residual / fit.length;
                ClassificationResult::new(ShapeKind::Line, confidence)
            }
            _ => ClassificationResult::none(),
        }
    }

    fn round(points: &[Point], hull: &[Point], thinness: f64) -> Option<ClassificationResult> {
        let aspect = min_area_rect(hull).aspect_ratio();
        let kind = if aspect > CIRCLE_ASPECT {
            ShapeKind::Circle
        } else if aspect > OVAL_ASPECT {
            ShapeKind::Oval
        } else {
            return None;
        };
        let thinness_score = 1.0 - (thinness - 4.0 * PI).abs();
        let fit_score = match (kind, fit_circle(points)) {
            (ShapeKind::Circle, Some(fit)) if fit.radius > EPSILON => {
                1.0 - 5.0 * fit.rms_residual / fit.radius
            }
            // Residuals against a circle say nothing about an oval
            _ => aspect,
        };
        Some(ClassificationResult::new(
            kind,
            0.5 * thinness_score.max(0.0) + 0.5 * fit_score.max(0.0),
        ))
    }
}

impl Classifier for HullClassifier {
    fn classify(&self, points: &[Point]) -> ClassificationResult {
        if points.len() < 3 || path_length(points) < EPSILON {
            return ClassificationResult::none();
        }
        let working = apply_virtual_closure(points);
        let hull = convex_hull(&simplify(&working, SIMPLIFY_EPSILON));
        let hull_area = polygon_area(&hull);
        let thinness = thinness_ratio(polygon_perimeter(&hull), hull_area);
        debug!(thinness, hull_points = hull.len(), "hull measurements");

        if thinness > LINE_THINNESS {
            return Self::line(points);
        }
        if !is_closed(&working) {
            // Only lines are open shapes
            return ClassificationResult::none();
        }

        if (ROUND_THINNESS.0..=ROUND_THINNESS.1).contains(&thinness) {
            if let Some(result) = Self::round(&working, &hull, thinness) {
                return result;
            }
        }

        let triangle_ratio = largest_inscribed_triangle(&hull) / hull_area;
        if triangle_ratio > TRIANGLE_RATIO {
            let confidence = 0.5 + 0.5 * (triangle_ratio - TRIANGLE_RATIO) / (1.0 - TRIANGLE_RATIO);
            return ClassificationResult::new(ShapeKind::Triangle, confidence);
        }

        let rect = min_area_rect(&hull);
        let rect_ratio = if rect.area() > EPSILON { hull_area / rect.area() } else { 0.0 };
        debug!(triangle_ratio, rect_ratio, "hull ratios");
        if rect_ratio > RECTANGLE_RATIO {
            let kind = if rect.aspect_ratio() > SQUARE_ASPECT {
                ShapeKind::Square
            } else {
                ShapeKind::Rectangle
            };
            let confidence = 0.5 + 0.5 * (rect_ratio - RECTANGLE_RATIO) / (1.0 - RECTANGLE_RATIO);
            return ClassificationResult::new(kind, confidence);
        }

        ClassificationResult::none()
    }

    fn name(&self) -> &'static str {
        "hull"
    }
}

/// Area of the largest triangle with corners on the hull.
fn largest_inscribed_triangle(hull: &[Point]) -> f64 {
    let n = hull.len();
    let mut best = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                best = best.max(triangle_area(hull[i], hull[j], hull[k]));
            }
        }
    }
    best
}
