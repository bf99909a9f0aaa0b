//! Rule-based classifier: independent geometric detectors plus tie-break rules.

use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use tracing::debug;

use super::{ClassificationResult, Classifier, ShapeKind};
use crate::config::RuleThresholds;
use crate::features::{
    closed_outline, convex_hull, extreme_points, min_area_rect, polygon_vertices, turning_angle,
};
use crate::geometry::{
    bounding_box, path_length, perpendicular_distance, polygon_area, self_intersections,
    triangle_area, Point, EPSILON,
};
use crate::normalize::{resample, RESAMPLE_POINTS};

/// Simplification tolerance for vertex finding, relative to the shape size.
const VERTEX_EPSILON: f64 = 0.06;
/// Neighbour offset used when measuring turning along the outline.
const TURN_WINDOW: usize = 3;
/// Extreme points closer than this (relative to the shape size) are merged.
const EXTREME_MERGE: f64 = 0.15;

/// Ways of picking three corners on a closed outline, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriangleStrategy {
    /// The three sharpest turning peaks.
    SharpCorners,
    /// Largest triangle on the top, bottom, left and right extremes.
    Extremes,
    /// The simplified outline has exactly three vertices.
    Sides,
    /// Samples a third of the outline apart, starting where the pen went down.
    Thirds,
}

/// Recognizes shapes from hand-tuned geometric measurements.
///
/// Open strokes only run the line detector. Closed strokes run the circle,
/// quadrilateral and triangle detectors on an evenly resampled outline and
/// the best score wins, with a preference for polygons over circles when
/// both are plausible.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    thresholds: RuleThresholds,
}

impl RuleClassifier {
    /// Create a classifier with the given thresholds.
    #[must_use]
    pub fn new(thresholds: RuleThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    fn detect_line(&self, points: &[Point]) -> ClassificationResult {
        let (first, last) = (points[0], points[points.len() - 1]);
        if first.distance_to(last) < EPSILON {
            return ClassificationResult::none();
        }
        #[allow(clippy::cast_precision_loss)]
        let deviation = points
            .iter()
            .map(|p| perpendicular_distance(*p, first, last))
            .sum::<f64>()
            / points.len() as f64;
        let confidence = 1.0 - deviation / self.thresholds.line_max_deviation;
        if confidence > self.thresholds.line_min_confidence {
            ClassificationResult::new(ShapeKind::Line, confidence)
        } else {
            ClassificationResult::none()
        }
    }

    fn detect_circle(&self, samples: &[Point]) -> ClassificationResult {
        let t = &self.thresholds;
        let rect = min_area_rect(samples);
        if rect.width < EPSILON || rect.height < EPSILON {
            return ClassificationResult::none();
        }

        // Radii in the frame where the fitted rectangle becomes a unit square
        let radii: Vec<f64> = samples
            .iter()
            .map(|p| {
                let local = p.rotate_about(rect.center, -rect.angle);
                let u = (local.x - rect.center.x) / (rect.width / 2.0);
                let v = (local.y - rect.center.y) / (rect.height / 2.0);
                u.hypot(v)
            })
            .collect();
        let radius_score = (1.0 - coefficient_of_variation(&radii)).max(0.0);

        let turns = windowed_turns(samples, TURN_WINDOW);
        let curvature_score = 1.0 - (coefficient_of_variation(&turns) / 2.0).min(1.0);

        let aspect = rect.aspect_ratio();
        let score = 0.4 * radius_score + 0.4 * curvature_score + 0.2 * aspect;
        debug!(radius_score, curvature_score, aspect, score, "circle detector");

        if score < t.circle_min_score || aspect < t.circle_min_aspect {
            return ClassificationResult::none();
        }
        let kind = if aspect > t.circle_aspect_split {
            ShapeKind::Circle
        } else {
            ShapeKind::Oval
        };
        ClassificationResult::new(kind, score)
    }

    fn detect_quad(&self, samples: &[Point], size: f64) -> ClassificationResult {
        let t = &self.thresholds;
        let mut vertices = polygon_vertices(&ring(samples), VERTEX_EPSILON * size);
        let corner_score = match vertices.len() {
            4 => 1.0,
            5 => {
                drop_flattest(&mut vertices);
                0.6
            }
            _ => return ClassificationResult::none(),
        };

        let sides: Vec<f64> = (0..4)
            .map(|i| vertices[i].angle_to(vertices[(i + 1) % 4]))
            .collect();
        let parallel_error =
            (line_angle_difference(sides[0], sides[2]) + line_angle_difference(sides[1], sides[3]))
                / 2.0;
        let parallel_score = (1.0 - parallel_error / FRAC_PI_4).max(0.0);

        let angle_error = (0..4)
            .map(|i| {
                let interior = PI - turning_angle(vertices[(i + 3) % 4], vertices[i], vertices[(i + 1) % 4]);
                (interior - FRAC_PI_2).abs()
            })
            .sum::<f64>()
            / 4.0;
        let right_angle_score = (1.0 - angle_error / FRAC_PI_4).max(0.0);

        let coverage = edge_coverage(samples, &vertices, t.edge_tolerance * size);
        if coverage < t.quad_min_coverage {
            return ClassificationResult::none();
        }

        let score = 0.3 * corner_score + 0.25 * parallel_score + 0.25 * right_angle_score + 0.2 * coverage;
        debug!(corner_score, parallel_score, right_angle_score, coverage, score, "quad detector");
        if score < t.quad_min_score {
            return ClassificationResult::none();
        }
        let kind = if min_area_rect(samples).aspect_ratio() > t.square_aspect_split {
            ShapeKind::Square
        } else {
            ShapeKind::Rectangle
        };
        ClassificationResult::new(kind, score)
    }

    fn detect_triangle(&self, samples: &[Point], size: f64) -> ClassificationResult {
        let hull_area = polygon_area(&convex_hull(samples));
        if hull_area < EPSILON {
            return ClassificationResult::none();
        }
        let vertices = polygon_vertices(&ring(samples), VERTEX_EPSILON * size);
        let corner_score = if vertices.len() == 3 { 1.0 } else { 0.6 };

        let Some((strategy, [a, b, c], coverage)) = self.find_triangle(samples, &vertices, size) else {
            return ClassificationResult::none();
        };
        let area_ratio = (triangle_area(a, b, c) / hull_area).min(1.0);
        let score = 0.5 * coverage + 0.3 * area_ratio + 0.2 * corner_score;
        debug!(strategy = ?strategy, coverage, area_ratio, corner_score, score, "triangle detector");
        ClassificationResult::new(ShapeKind::Triangle, score)
    }

    /// Corners from the first strategy whose triangle covers the outline.
    fn find_triangle(
        &self,
        samples: &[Point],
        vertices: &[Point],
        size: f64,
    ) -> Option<(TriangleStrategy, [Point; 3], f64)> {
        let t = &self.thresholds;
        let min_turn = t.triangle_corner_turn_deg.to_radians();
        let strategies: [(TriangleStrategy, &dyn Fn() -> Option<[Point; 3]>); 4] = [
            (TriangleStrategy::SharpCorners, &|| sharp_corners(samples, min_turn)),
            (TriangleStrategy::Extremes, &|| extreme_triangle(samples, EXTREME_MERGE * size)),
            (TriangleStrategy::Sides, &|| {
                (vertices.len() == 3).then(|| [vertices[0], vertices[1], vertices[2]])
            }),
            (TriangleStrategy::Thirds, &|| outline_thirds(samples)),
        ];
        first_covering(
            samples,
            strategies.iter().map(|(strategy, find)| (*strategy, find())),
            t.edge_tolerance * size,
            t.triangle_min_coverage,
        )
    }

    fn classify_closed(&self, outline: &[Point]) -> ClassificationResult {
        let t = &self.thresholds;
        let mut samples = resample(outline, RESAMPLE_POINTS);
        samples.pop();
        let size = bounding_box(&samples).max_side();
        if size < EPSILON {
            return ClassificationResult::none();
        }

        let mut circle = self.detect_circle(&samples);
        let mut quad = self.detect_quad(&samples, size);
        let mut triangle = self.detect_triangle(&samples, size);

        let crossings = self_intersections(outline);
        if crossings > t.max_self_intersections {
            debug!(crossings, "damping self-intersecting stroke");
            for result in [&mut circle, &mut quad, &mut triangle] {
                result.confidence *= t.self_intersection_damping;
            }
        }

        let best = [circle, quad, triangle]
            .into_iter()
            .filter(ClassificationResult::is_shape)
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(Ordering::Equal))
            .unwrap_or_else(ClassificationResult::none);

        if best.kind == circle.kind && circle.is_shape() {
            if quad.is_shape()
                && quad.confidence > t.quad_over_circle
                && circle.confidence > t.quad_over_circle
            {
                return quad;
            }
            if triangle.is_shape() && triangle.confidence > t.triangle_over_circle {
                return triangle;
            }
        }
        best
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, points: &[Point]) -> ClassificationResult {
        if points.len() < 3 || path_length(points) < EPSILON {
            return ClassificationResult::none();
        }
        let result = match closed_outline(points) {
            Some(outline) => self.classify_closed(&outline),
            None => self.detect_line(points),
        };
        debug!(kind = ?result.kind, confidence = result.confidence, "rules classified stroke");
        result
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

/// Samples with the first point repeated at the end.
fn ring(samples: &[Point]) -> Vec<Point> {
    let mut ring = samples.to_vec();
    if let Some(&first) = samples.first() {
        ring.push(first);
    }
    ring
}

#[allow(clippy::cast_precision_loss)]
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean.abs() < EPSILON {
        return f64::INFINITY;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

/// Turning angle at every sample of a cyclic outline, measured against the
/// samples `k` positions before and after.
fn windowed_turns(samples: &[Point], k: usize) -> Vec<f64> {
    let n = samples.len();
    if n < 2 * k + 1 {
        return Vec::new();
    }
    (0..n)
        .map(|i| turning_angle(samples[(i + n - k) % n], samples[i], samples[(i + k) % n]))
        .collect()
}

/// Angle between two undirected lines given their directions, in `[0, π/2]`.
fn line_angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(PI);
    diff.min(PI - diff)
}

/// Remove the vertex of a closed polygon that turns the least.
fn drop_flattest(vertices: &mut Vec<Point>) {
    let n = vertices.len();
    let flattest = (0..n).min_by(|&i, &j| {
        let ti = turning_angle(vertices[(i + n - 1) % n], vertices[i], vertices[(i + 1) % n]);
        let tj = turning_angle(vertices[(j + n - 1) % n], vertices[j], vertices[(j + 1) % n]);
        ti.partial_cmp(&tj).unwrap_or(Ordering::Equal)
    });
    if let Some(i) = flattest {
        vertices.remove(i);
    }
}

/// Fraction of samples within `tolerance` of some edge of the closed polygon.
#[allow(clippy::cast_precision_loss)]
fn edge_coverage(samples: &[Point], polygon: &[Point], tolerance: f64) -> f64 {
    if samples.is_empty() || polygon.len() < 2 {
        return 0.0;
    }
    let n = polygon.len();
    let covered = samples
        .iter()
        .filter(|p| {
            (0..n).any(|i| perpendicular_distance(**p, polygon[i], polygon[(i + 1) % n]) <= tolerance)
        })
        .count();
    covered as f64 / samples.len() as f64
}

/// The three sharpest turning peaks above `min_turn`, in outline order.
fn sharp_corners(samples: &[Point], min_turn: f64) -> Option<[Point; 3]> {
    let turns = windowed_turns(samples, TURN_WINDOW);
    let n = turns.len();
    let mut order: Vec<usize> = (0..n).filter(|&i| turns[i] > min_turn).collect();
    order.sort_by(|&a, &b| turns[b].partial_cmp(&turns[a]).unwrap_or(Ordering::Equal));

    let mut picked: Vec<usize> = Vec::with_capacity(3);
    for i in order {
        let clear = picked.iter().all(|&j| {
            let gap = i.abs_diff(j);
            gap.min(n - gap) > 2 * TURN_WINDOW
        });
        if clear {
            picked.push(i);
            if picked.len() == 3 {
                break;
            }
        }
    }
    if picked.len() < 3 {
        return None;
    }
    picked.sort_unstable();
    Some([samples[picked[0]], samples[picked[1]], samples[picked[2]]])
}

/// The first candidate whose edges come within `tolerance` of at least
/// `min_coverage` of the samples, with that coverage.
fn first_covering(
    samples: &[Point],
    candidates: impl IntoIterator<Item = (TriangleStrategy, Option<[Point; 3]>)>,
    tolerance: f64,
    min_coverage: f64,
) -> Option<(TriangleStrategy, [Point; 3], f64)> {
    candidates.into_iter().find_map(|(strategy, corners)| {
        let corners = corners?;
        let coverage = edge_coverage(samples, &corners, tolerance);
        (coverage >= min_coverage).then_some((strategy, corners, coverage))
    })
}

/// First, middle and last of the outline read as a closed loop: samples a
/// third of the way apart, so the pick never lands on the closing point.
fn outline_thirds(samples: &[Point]) -> Option<[Point; 3]> {
    let n = samples.len();
    (n >= 3).then(|| [samples[0], samples[n / 3], samples[2 * n / 3]])
}

/// Largest triangle spanned by the top, bottom, left and right extremes.
fn extreme_triangle(samples: &[Point], merge_distance: f64) -> Option<[Point; 3]> {
    let extremes = extreme_points(samples, merge_distance);
    if extremes.len() < 3 {
        return None;
    }
    let mut best: Option<([Point; 3], f64)> = None;
    for i in 0..extremes.len() {
        for j in (i + 1)..extremes.len() {
            for k in (j + 1)..extremes.len() {
                let tri = [extremes[i], extremes[j], extremes[k]];
                let area = triangle_area(tri[0], tri[1], tri[2]);
                let larger = match best {
                    Some((_, a)) => area > a,
                    None => true,
                };
                if larger {
                    best = Some((tri, area));
                }
            }
        }
    }
    best.filter(|(_, area)| *area > EPSILON).map(|(tri, _)| tri)
}
