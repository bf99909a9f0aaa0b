//! 2D geometry primitives shared by every stage of recognition.
//!
//! All functions are total: degenerate input (empty slices, a single point,
//! zero-length segments) returns a zero-valued result rather than an error.

use serde::{Deserialize, Serialize};

/// Tolerance below which lengths and determinants are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// A 2D sample in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other` (`t = 0` is `self`, `t = 1` is `other`).
    #[must_use]
    pub fn lerp(&self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }

    /// Rotate about `pivot` by `angle` radians (counter-clockwise in a y-up frame).
    #[must_use]
    pub fn rotate_about(&self, pivot: Self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Self::new(
            dx * cos - dy * sin + pivot.x,
            dx * sin + dy * cos + pivot.y,
        )
    }

    /// Angle of the vector from `self` to `other`, in radians.
    #[must_use]
    pub fn angle_to(&self, other: Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl Bounds {
    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Length of the diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    /// The larger of width and height.
    #[must_use]
    pub fn max_side(&self) -> f64 {
        self.width().max(self.height())
    }

    /// Smaller side over larger side, in `[0, 1]`. Zero for a degenerate box.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        let max = self.max_side();
        if max < EPSILON {
            0.0
        } else {
            self.width().min(self.height()) / max
        }
    }

    /// Area of the box.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance_to(b)
}

/// Arithmetic mean of the points. The origin for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Stroke lengths are far below 2^52
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let n = points.len() as f64;
    Point::new(sx / n, sy / n)
}

/// Axis-aligned bounding box of the points. All-zero for an empty slice.
#[must_use]
pub fn bounding_box(points: &[Point]) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds::default();
    };
    points.iter().skip(1).fold(
        Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        },
        |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        },
    )
}

/// Unsigned polygon area via the shoelace formula. The polygon wraps from the
/// last point back to the first.
#[must_use]
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}

/// Polygon perimeter, including the closing edge from last to first.
#[must_use]
pub fn polygon_perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let closing = points[points.len() - 1].distance_to(points[0]);
    path_length(points) + closing
}

/// Length of the open polyline through the points.
#[must_use]
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(w[1])).sum()
}

/// Distance from `p` to the segment `a`–`b`.
///
/// A zero-length segment degrades to the distance from `p` to `a`.
#[must_use]
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < EPSILON {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Intersection of segments `a1`–`a2` and `b1`–`b2`.
///
/// Returns `None` for parallel segments or when the crossing lies outside
/// either segment's `[0, 1]` parameter range.
#[must_use]
pub fn segment_intersection(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    let (t, u) = intersection_params(a1, a2, b1, b2)?;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1.lerp(a2, t))
    } else {
        None
    }
}

/// All points where segment `a`–`b` crosses the edges of `polygon` (which wraps).
#[must_use]
pub fn segment_polygon_intersections(a: Point, b: Point, polygon: &[Point]) -> Vec<Point> {
    if polygon.len() < 2 {
        return Vec::new();
    }
    let n = polygon.len();
    (0..n)
        .filter_map(|i| segment_intersection(a, b, polygon[i], polygon[(i + 1) % n]))
        .collect()
}

/// Number of proper crossings between non-adjacent segments of an open polyline.
///
/// Touching at shared endpoints (including a stroke that ends exactly on its
/// start point) is not counted.
#[must_use]
pub fn self_intersections(points: &[Point]) -> usize {
    const INTERIOR: f64 = 1e-6;
    let segments = points.len().saturating_sub(1);
    let mut count = 0;
    for i in 0..segments {
        for j in (i + 2)..segments {
            let hit = intersection_params(points[i], points[i + 1], points[j], points[j + 1])
                .is_some_and(|(t, u)| {
                    t > INTERIOR && t < 1.0 - INTERIOR && u > INTERIOR && u < 1.0 - INTERIOR
                });
            if hit {
                count += 1;
            }
        }
    }
    count
}

/// Cross product of `o→a` and `o→b`. Positive for a left (counter-clockwise) turn.
#[must_use]
pub fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Area of the triangle `a`, `b`, `c`.
#[must_use]
pub fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    cross(a, b, c).abs() / 2.0
}

/// Parametric intersection of the infinite lines through two segments.
fn intersection_params(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<(f64, f64)> {
    let rx = a2.x - a1.x;
    let ry = a2.y - a1.y;
    let sx = b2.x - b1.x;
    let sy = b2.y - b1.y;
    let denom = rx * sy - ry * sx;
    if denom.abs() < EPSILON {
        return None;
    }
    let qx = b1.x - a1.x;
    let qy = b1.y - a1.y;
    let t = (qx * sy - qy * sx) / denom;
    let u = (qx * ry - qy * rx) / denom;
    Some((t, u))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_distance() {
        assert!(approx_eq(
            distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            5.0
        ));
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&unit_square());
        assert!(approx_eq(c.x, 0.5));
        assert!(approx_eq(c.y, 0.5));
    }

    #[test]
    fn test_centroid_empty_is_origin() {
        assert_eq!(centroid(&[]), Point::default());
    }

    #[test]
    fn test_bounding_box() {
        let b = bounding_box(&[Point::new(-2.0, 1.0), Point::new(4.0, -3.0)]);
        assert!(approx_eq(b.width(), 6.0));
        assert!(approx_eq(b.height(), 4.0));
        assert!(approx_eq(b.center().x, 1.0));
        assert!(approx_eq(b.center().y, -1.0));
        assert!(approx_eq(b.aspect_ratio(), 4.0 / 6.0));
    }

    #[test]
    fn test_polygon_area_and_perimeter() {
        let square = unit_square();
        assert!(approx_eq(polygon_area(&square), 1.0));
        assert!(approx_eq(polygon_perimeter(&square), 4.0));
    }

    #[test]
    fn test_polygon_area_orientation_independent() {
        let mut square = unit_square();
        square.reverse();
        assert!(approx_eq(polygon_area(&square), 1.0));
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        let single = [Point::new(5.0, 5.0)];
        assert!(approx_eq(polygon_area(&single), 0.0));
        assert!(approx_eq(polygon_perimeter(&single), 0.0));
        assert!(approx_eq(path_length(&single), 0.0));
        assert!(approx_eq(polygon_area(&[]), 0.0));
    }

    #[test]
    fn test_perpendicular_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(approx_eq(perpendicular_distance(Point::new(5.0, 3.0), a, b), 3.0));
        // Beyond the segment end, distance is to the endpoint
        assert!(approx_eq(perpendicular_distance(Point::new(13.0, 4.0), a, b), 5.0));
        // Zero-length segment
        assert!(approx_eq(perpendicular_distance(Point::new(3.0, 4.0), a, a), 5.0));
    }

    #[test]
    fn test_segment_intersection() {
        let hit = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
        )
        .expect("segments cross");
        assert!(approx_eq(hit.x, 1.0));
        assert!(approx_eq(hit.y, 1.0));
    }

    #[test]
    fn test_segment_intersection_parallel_or_outside() {
        let parallel = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        );
        assert!(parallel.is_none());

        let outside = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, -1.0),
            Point::new(2.0, 1.0),
        );
        assert!(outside.is_none());
    }

    #[test]
    fn test_segment_polygon_intersections() {
        let hits = segment_polygon_intersections(
            Point::new(-1.0, 0.5),
            Point::new(2.0, 0.5),
            &unit_square(),
        );
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_self_intersections() {
        // A figure-eight crosses itself once
        let eight = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
            Point::new(0.0, 0.0),
        ];
        assert_eq!(self_intersections(&eight), 1);

        // A closed square touches its start point but never crosses
        let mut square = unit_square();
        square.push(square[0]);
        assert_eq!(self_intersections(&square), 0);
    }

    #[test]
    fn test_rotate_about() {
        let p = Point::new(1.0, 0.0).rotate_about(Point::default(), std::f64::consts::FRAC_PI_2);
        assert!(approx_eq(p.x, 0.0));
        assert!(approx_eq(p.y, 1.0));
    }
}
