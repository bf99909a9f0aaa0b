//! # Feature Extraction
//!
//! Scale-aware measurements of a stroke that the classifiers build on:
//! closure, corner count, convex hull, minimum-area rectangle and the
//! roundness/thinness ratios.

use std::cmp::Ordering;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::{
    bounding_box, centroid, cross, path_length, perpendicular_distance, polygon_area, polygon_perimeter,
    Point, EPSILON,
};
use crate::normalize::scale_to_square;

/// Gap below which a stroke is closed regardless of its length (pixels).
pub const CLOSURE_ABSOLUTE: f64 = 30.0;
/// Gap below which a stroke is closed, as a fraction of its path length.
pub const CLOSURE_RELATIVE: f64 = 0.2;
/// Largest gap virtual closure will bridge (pixels).
pub const VIRTUAL_CLOSURE_ABSOLUTE: f64 = 40.0;
/// Largest gap virtual closure will bridge, as a fraction of path length.
pub const VIRTUAL_CLOSURE_RELATIVE: f64 = 0.25;
/// Simplification tolerance used for corner counting, in reference units.
pub const CORNER_EPSILON: f64 = 2.0;
/// Side of the box strokes are scaled into before corners are counted.
pub const CORNER_REFERENCE_SIZE: f64 = 50.0;
/// Vertices turning by less than this (radians) are not corners.
pub const MIN_CORNER_TURN: f64 = 25.0 * PI / 180.0;
/// Points within this fraction of the merge distance of an extreme tie with it.
const EXTREME_TIE: f64 = 0.05;

/// Distance between the last and the first point.
#[must_use]
pub fn closure_gap(points: &[Point]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => first.distance_to(*last),
        _ => 0.0,
    }
}

/// Whether the stroke ends close enough to where it started to be a closed outline.
///
/// The gap must be under [`CLOSURE_ABSOLUTE`] or under [`CLOSURE_RELATIVE`] of
/// the path length, and under half the path length so a short straight
/// stroke never counts as a loop.
#[must_use]
pub fn is_closed(points: &[Point]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let gap = closure_gap(points);
    let length = path_length(points);
    if length < EPSILON || gap >= length * 0.5 {
        return false;
    }
    gap < CLOSURE_ABSOLUTE || gap < CLOSURE_RELATIVE * length
}

/// Close an almost-closed stroke by appending a copy of its first point.
///
/// Strokes that are already closed, or whose gap is too wide, come back
/// unchanged. The caller's points are never modified.
#[must_use]
pub fn apply_virtual_closure(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 || is_closed(points) {
        return points.to_vec();
    }
    let gap = closure_gap(points);
    let length = path_length(points);
    let mut out = points.to_vec();
    if gap < VIRTUAL_CLOSURE_ABSOLUTE && gap < VIRTUAL_CLOSURE_RELATIVE * length {
        out.push(points[0]);
    }
    out
}

/// Cut off a tail that runs on past the start point.
///
/// Looks for the point in the second half of the path (by length) nearest
/// the start. If it is nearer than the end point and the stroke up to it is
/// closed, everything after it is dropped. Any other stroke comes back
/// unchanged.
#[must_use]
pub fn trim_overshoot(points: &[Point]) -> Vec<Point> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let start = points[0];
    let half = path_length(points) / 2.0;
    let mut walked = 0.0;
    let mut nearest: Option<(usize, f64)> = None;
    for i in 1..points.len() {
        walked += points[i - 1].distance_to(points[i]);
        if walked < half {
            continue;
        }
        let d = start.distance_to(points[i]);
        let closer = match nearest {
            Some((_, best)) => d < best,
            None => true,
        };
        if closer {
            nearest = Some((i, d));
        }
    }
    match nearest {
        Some((i, d)) if i + 1 < points.len() && d < closure_gap(points) && is_closed(&points[..=i]) => {
            points[..=i].to_vec()
        }
        _ => points.to_vec(),
    }
}

/// The stroke as an explicitly closed ring (last point equal to the first),
/// or `None` if it is not closed even after virtual closure.
///
/// A tail that runs past the start point is cut off first (see
/// [`trim_overshoot`]).
#[must_use]
pub fn closed_outline(points: &[Point]) -> Option<Vec<Point>> {
    let mut working = apply_virtual_closure(&trim_overshoot(points));
    if !is_closed(&working) {
        return None;
    }
    if working.first() != working.last() {
        working.push(working[0]);
    }
    Some(working)
}

/// Ramer–Douglas–Peucker simplification.
///
/// Splits at the point of maximum deviation from the chord while that
/// deviation exceeds `epsilon`. Polylines shorter than three points are
/// returned as they are.
#[must_use]
pub fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let (index, max_dist) = points[1..points.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, perpendicular_distance(*p, first, last)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if max_dist > epsilon {
        let mut left = simplify(&points[..=index], epsilon);
        let right = simplify(&points[index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Turning angle at `b` on the path `a → b → c`, in `[0, π]`.
#[must_use]
pub fn turning_angle(a: Point, b: Point, c: Point) -> f64 {
    let d1 = a.angle_to(b);
    let d2 = b.angle_to(c);
    let mut turn = (d2 - d1).abs();
    if turn > PI {
        turn = 2.0 * PI - turn;
    }
    turn
}

/// Significant vertices of a stroke: RDP simplification followed, for closed
/// strokes, by dropping the duplicated closing point and pruning vertices that
/// barely change direction.
#[must_use]
pub fn polygon_vertices(points: &[Point], epsilon: f64) -> Vec<Point> {
    let mut vertices = simplify(points, epsilon);
    let closed = vertices.len() > 3
        && vertices[0].distance_to(vertices[vertices.len() - 1]) < EPSILON.max(epsilon * 0.5);
    if !closed {
        return vertices;
    }
    vertices.pop();

    // Remove the flattest vertex until every remaining one is a real corner
    while vertices.len() > 3 {
        let n = vertices.len();
        let flattest = (0..n)
            .map(|i| {
                let turn = turning_angle(vertices[(i + n - 1) % n], vertices[i], vertices[(i + 1) % n]);
                (i, turn)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        match flattest {
            Some((i, turn)) if turn < MIN_CORNER_TURN => {
                vertices.remove(i);
            }
            _ => break,
        }
    }
    vertices
}

/// Number of corners: vertices surviving simplification of the stroke scaled
/// into the [`CORNER_REFERENCE_SIZE`] box.
#[must_use]
pub fn count_corners(points: &[Point]) -> usize {
    if points.len() < 2 {
        return points.len();
    }
    let scaled = scale_to_square(points, CORNER_REFERENCE_SIZE);
    polygon_vertices(&scaled, CORNER_EPSILON).len()
}

/// Perimeter of the equal-area circle over the actual perimeter, clipped to 1.
#[must_use]
pub fn roundness(points: &[Point]) -> f64 {
    let perimeter = polygon_perimeter(points);
    if perimeter < EPSILON {
        return 0.0;
    }
    let ideal = 2.0 * PI * (polygon_area(points) / PI).sqrt();
    (ideal / perimeter).min(1.0)
}

/// `perimeter² / area`. Infinite for a polygon with no area.
#[must_use]
pub fn thinness_ratio(perimeter: f64, area: f64) -> f64 {
    if area < EPSILON {
        f64::INFINITY
    } else {
        perimeter * perimeter / area
    }
}

/// Convex hull by Graham scan, counter-clockwise starting from the lowest point.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|q| q.distance_to(*p) < EPSILON) {
            unique.push(*p);
        }
    }
    if unique.len() < 3 {
        return unique;
    }

    let pivot_index = unique
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        })
        .map_or(0, |(i, _)| i);
    let pivot = unique.swap_remove(pivot_index);

    unique.sort_by(|a, b| {
        let angle_a = pivot.angle_to(*a);
        let angle_b = pivot.angle_to(*b);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                pivot
                    .distance_to(*a)
                    .partial_cmp(&pivot.distance_to(*b))
                    .unwrap_or(Ordering::Equal)
            })
    });

    let mut hull = vec![pivot];
    for p in unique {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull
}

/// Topmost, bottommost, leftmost and rightmost points with near-duplicates merged.
///
/// Along a flat side every sample is nearly extreme, so among points within
/// a small tolerance of the extreme the one farthest from the centroid is
/// taken. When two extremes lie within `merge_distance` the farther one from
/// the centroid is kept, so corners win over points along a side.
#[must_use]
pub fn extreme_points(points: &[Point], merge_distance: f64) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let center = centroid(points);
    let reach = |p: &Point| p.distance_to(center);
    let tie = merge_distance * EXTREME_TIE;
    let pick = |key: fn(&Point) -> f64| {
        let extreme = points.iter().map(key).fold(f64::INFINITY, f64::min);
        points
            .iter()
            .copied()
            .filter(|p| key(p) <= extreme + tie)
            .max_by(|a, b| reach(a).partial_cmp(&reach(b)).unwrap_or(Ordering::Equal))
    };
    let candidates = [pick(|p| p.y), pick(|p| -p.y), pick(|p| p.x), pick(|p| -p.x)];

    let mut out: Vec<Point> = Vec::with_capacity(4);
    for p in candidates.into_iter().flatten() {
        match out.iter().position(|q| q.distance_to(p) <= merge_distance) {
            Some(i) if reach(&p) > reach(&out[i]) => out[i] = p,
            Some(_) => {}
            None => out.push(p),
        }
    }
    out
}

/// First, middle and last point.
#[must_use]
pub fn first_mid_last(points: &[Point]) -> Option<[Point; 3]> {
    if points.len() < 3 {
        return None;
    }
    Some([points[0], points[points.len() / 2], points[points.len() - 1]])
}

/// Minimum-area bounding rectangle of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinAreaRect {
    /// Center of the rectangle.
    pub center: Point,
    /// Extent along the rectangle's own x axis.
    pub width: f64,
    /// Extent along the rectangle's own y axis.
    pub height: f64,
    /// Rotation of the rectangle's x axis, in radians.
    pub angle: f64,
}

impl MinAreaRect {
    /// Area of the rectangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Smaller side over larger side.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        let max = self.width.max(self.height);
        if max < EPSILON {
            0.0
        } else {
            self.width.min(self.height) / max
        }
    }

    /// The four corners, counter-clockwise.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(x, y)| {
            Point::new(self.center.x + x, self.center.y + y).rotate_about(self.center, self.angle)
        })
    }
}

/// Minimum-area rectangle over the edges of the convex hull of `points`.
///
/// Each hull edge is made axis-aligned in turn and the rotation with the
/// smallest axis-aligned box wins.
#[must_use]
pub fn min_area_rect(points: &[Point]) -> MinAreaRect {
    let hull = convex_hull(points);
    let axis_aligned = |angle: f64| {
        let rotated: Vec<Point> = hull
            .iter()
            .map(|p| p.rotate_about(Point::default(), -angle))
            .collect();
        let b = bounding_box(&rotated);
        MinAreaRect {
            center: b.center().rotate_about(Point::default(), angle),
            width: b.width(),
            height: b.height(),
            angle,
        }
    };

    if hull.len() < 3 {
        let angle = match hull.as_slice() {
            [a, b] => a.angle_to(*b),
            _ => 0.0,
        };
        return axis_aligned(angle);
    }

    let n = hull.len();
    (0..n)
        .map(|i| axis_aligned(hull[i].angle_to(hull[(i + 1) % n])))
        .min_by(|a, b| a.area().partial_cmp(&b.area()).unwrap_or(Ordering::Equal))
        .unwrap_or_else(|| axis_aligned(0.0))
}

/// The bundle of features the template classifier's confidence correction
/// and the session logs use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeFeatures {
    /// Closed after virtual closure.
    pub closed: bool,
    /// Distance between the raw end and start points.
    pub gap: f64,
    /// Raw path length.
    pub path_length: f64,
    /// Scale-independent corner count.
    pub corner_count: usize,
    /// Aspect ratio of the minimum-area rectangle.
    pub aspect_ratio: f64,
    /// Roundness of the (closed) outline.
    pub roundness: f64,
    /// Thinness ratio of the convex hull.
    pub thinness: f64,
}

impl StrokeFeatures {
    /// Measure a raw stroke.
    #[must_use]
    pub fn extract(points: &[Point]) -> Self {
        let working = apply_virtual_closure(points);
        let outline = closed_outline(points);
        let hull = convex_hull(&working);
        Self {
            closed: outline.is_some(),
            gap: closure_gap(points),
            path_length: path_length(points),
            corner_count: count_corners(outline.as_deref().unwrap_or(&working)),
            aspect_ratio: min_area_rect(&working).aspect_ratio(),
            roundness: roundness(&working),
            thinness: thinness_ratio(polygon_perimeter(&hull), polygon_area(&hull)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_shapes {
    //! Synthetic strokes shared by the classifier tests.

    use std::f64::consts::TAU;

    use crate::geometry::Point;

    #[allow(clippy::cast_precision_loss)]
    pub fn circle(center: Point, radius: f64, samples: usize) -> Vec<Point> {
        (0..samples)
            .map(|i| {
                let theta = TAU * i as f64 / samples as f64;
                Point::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
            })
            .collect()
    }

    /// Circle whose stroke carries on past the start by `overshoot` of a turn.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn overshooting_circle(center: Point, radius: f64, samples: usize, overshoot: f64) -> Vec<Point> {
        let last = (samples as f64 * (1.0 + overshoot)).round() as usize;
        (0..=last)
            .map(|i| {
                let theta = TAU * i as f64 / samples as f64;
                Point::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn ellipse(center: Point, rx: f64, ry: f64, samples: usize) -> Vec<Point> {
        (0..=samples)
            .map(|i| {
                let theta = TAU * i as f64 / samples as f64;
                Point::new(center.x + rx * theta.cos(), center.y + ry * theta.sin())
            })
            .collect()
    }

    /// Closed polygon outline with `per_edge` samples on each edge.
    #[allow(clippy::cast_precision_loss)]
    pub fn polygon(corners: &[Point], per_edge: usize) -> Vec<Point> {
        let n = corners.len();
        let mut out = Vec::with_capacity(n * per_edge + 1);
        for i in 0..n {
            let a = corners[i];
            let b = corners[(i + 1) % n];
            for k in 0..per_edge {
                out.push(a.lerp(b, k as f64 / per_edge as f64));
            }
        }
        out.push(corners[0]);
        out
    }

    pub fn square(origin: Point, side: f64) -> Vec<Point> {
        rectangle(origin, side, side)
    }

    pub fn rectangle(origin: Point, width: f64, height: f64) -> Vec<Point> {
        polygon(
            &[
                origin,
                Point::new(origin.x + width, origin.y),
                Point::new(origin.x + width, origin.y + height),
                Point::new(origin.x, origin.y + height),
            ],
            12,
        )
    }

    pub fn triangle(center: Point, radius: f64) -> Vec<Point> {
        let corners: Vec<Point> = [90.0_f64, 210.0, 330.0]
            .iter()
            .map(|deg| {
                let t = deg.to_radians();
                Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect();
        polygon(&corners, 15)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn line(from: Point, to: Point, samples: usize) -> Vec<Point> {
        (0..samples)
            .map(|i| from.lerp(to, i as f64 / (samples - 1) as f64))
            .collect()
    }

    /// Rotate by `angle`, scale by `scale`, then translate by `offset`.
    pub fn transform(points: &[Point], angle: f64, scale: f64, offset: Point) -> Vec<Point> {
        points
            .iter()
            .map(|p| {
                let r = p.rotate_about(Point::default(), angle);
                Point::new(r.x * scale + offset.x, r.y * scale + offset.y)
            })
            .collect()
    }
}
