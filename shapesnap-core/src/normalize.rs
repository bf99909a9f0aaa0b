//! # Stroke Normalization
//!
//! Brings a raw stroke into a canonical frame so that point clouds drawn at
//! different sizes, positions, speeds and starting directions can be compared
//! point by point.
//!
//! ```text
//! raw stroke ─► resample(N) ─► rotate_to_zero ─► scale_to_square ─► translate_to_origin
//! ```
//!
//! Every stage is `&[Point] -> Vec<Point>` and can be used on its own.

use crate::geometry::{bounding_box, centroid, path_length, Point, EPSILON};

/// Number of points every normalized stroke and template carries.
pub const RESAMPLE_POINTS: usize = 64;

/// Side of the reference square strokes are scaled into.
pub const SQUARE_SIZE: f64 = 250.0;

/// Golden ratio conjugate used by the angle search.
const PHI: f64 = 0.618_033_988_749_895;

/// Resample a stroke to exactly `n` points spaced at equal path-length intervals.
///
/// An empty stroke stays empty; a stroke with a single point (or with zero
/// length) becomes `n` copies of its first point.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Point counts are small
pub fn resample(points: &[Point], n: usize) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }
    let total = path_length(points);
    if points.len() == 1 || n == 1 || total < EPSILON {
        return vec![first; n];
    }

    let interval = total / (n - 1) as f64;
    let mut out = Vec::with_capacity(n);
    out.push(first);

    let mut accumulated = 0.0;
    for window in points.windows(2) {
        let (mut start, end) = (window[0], window[1]);
        let mut d = start.distance_to(end);
        while d > 0.0 && accumulated + d >= interval {
            let q = start.lerp(end, (interval - accumulated) / d);
            out.push(q);
            start = q;
            d = start.distance_to(end);
            accumulated = 0.0;
        }
        accumulated += d;
    }

    // Rounding can leave the walk one short of the final point
    let last = points[points.len() - 1];
    while out.len() < n {
        out.push(last);
    }
    out.truncate(n);
    out
}

/// Angle from the centroid to the first point.
#[must_use]
pub fn indicative_angle(points: &[Point]) -> f64 {
    let Some(&first) = points.first() else {
        return 0.0;
    };
    centroid(points).angle_to(first)
}

/// Rotate every point about the centroid by `angle` radians.
#[must_use]
pub fn rotate_by(points: &[Point], angle: f64) -> Vec<Point> {
    let c = centroid(points);
    points.iter().map(|p| p.rotate_about(c, angle)).collect()
}

/// Rotate the stroke so its first point lies on the positive x axis as seen
/// from the centroid.
#[must_use]
pub fn rotate_to_zero(points: &[Point]) -> Vec<Point> {
    rotate_by(points, -indicative_angle(points))
}

/// Uniformly scale the stroke so the larger bounding-box side equals `size`.
///
/// Aspect ratio is preserved. A stroke with no extent is returned unchanged.
#[must_use]
pub fn scale_to_square(points: &[Point], size: f64) -> Vec<Point> {
    let bounds = bounding_box(points);
    let extent = bounds.max_side();
    if extent < EPSILON {
        return points.to_vec();
    }
    let scale = size / extent;
    points
        .iter()
        .map(|p| {
            Point::new(
                (p.x - bounds.min_x) * scale,
                (p.y - bounds.min_y) * scale,
            )
        })
        .collect()
}

/// Translate the stroke so its centroid sits at the origin.
#[must_use]
pub fn translate_to_origin(points: &[Point]) -> Vec<Point> {
    let c = centroid(points);
    points
        .iter()
        .map(|p| Point::new(p.x - c.x, p.y - c.y))
        .collect()
}

/// The full pipeline: resample, rotate, scale, translate.
#[must_use]
pub fn normalize(points: &[Point], n: usize) -> Vec<Point> {
    normalize_resampled(&resample(points, n))
}

/// The pipeline without the resampling stage, for strokes that are already
/// evenly spaced (for example a cyclic shift of a resampled outline).
#[must_use]
pub fn normalize_resampled(points: &[Point]) -> Vec<Point> {
    translate_to_origin(&scale_to_square(&rotate_to_zero(points), SQUARE_SIZE))
}

/// Mean pointwise distance between two equally long point clouds.
///
/// Mismatched or empty inputs return `f64::INFINITY`, which every caller
/// treats as "no match".
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn path_distance(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return f64::INFINITY;
    }
    let sum: f64 = a.iter().zip(b).map(|(p, q)| p.distance_to(*q)).sum();
    sum / a.len() as f64
}

/// Smallest [`path_distance`] over rotations of `candidate` within
/// `±range` radians, found by golden-section search to within `precision`.
#[must_use]
pub fn distance_at_best_angle(
    candidate: &[Point],
    template: &[Point],
    range: f64,
    precision: f64,
) -> f64 {
    let at = |angle: f64| path_distance(&rotate_by(candidate, angle), template);

    let (mut lo, mut hi) = (-range, range);
    let mut x1 = PHI * lo + (1.0 - PHI) * hi;
    let mut f1 = at(x1);
    let mut x2 = (1.0 - PHI) * lo + PHI * hi;
    let mut f2 = at(x2);

    while (hi - lo).abs() > precision {
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = PHI * lo + (1.0 - PHI) * hi;
            f1 = at(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = (1.0 - PHI) * lo + PHI * hi;
            f2 = at(x2);
        }
    }
    f1.min(f2).min(at(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn zigzag() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 40.0),
            Point::new(60.0, 0.0),
            Point::new(90.0, 40.0),
        ]
    }

    #[test]
    fn test_resample_count() {
        assert_eq!(resample(&zigzag(), RESAMPLE_POINTS).len(), RESAMPLE_POINTS);
        assert_eq!(resample(&zigzag(), 5).len(), 5);
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let out = resample(&zigzag(), 16);
        assert_eq!(out[0], Point::new(0.0, 0.0));
        let last = out[15];
        assert!(approx_eq(last.x, 90.0));
        assert!(approx_eq(last.y, 40.0));
    }

    #[test]
    fn test_resample_empty_and_single() {
        assert!(resample(&[], 64).is_empty());
        let single = resample(&[Point::new(3.0, 4.0)], 64);
        assert_eq!(single.len(), 64);
        assert!(single.iter().all(|p| *p == Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_resample_identical_points() {
        let same = vec![Point::new(1.0, 1.0); 5];
        let out = resample(&same, 8);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|p| *p == Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_rotate_to_zero_puts_first_point_on_x_axis() {
        let rotated = rotate_to_zero(&zigzag());
        let c = centroid(&rotated);
        let first = rotated[0];
        assert!(approx_eq(first.y, c.y));
        assert!(first.x > c.x);
    }

    #[test]
    fn test_scale_to_square() {
        let scaled = scale_to_square(&zigzag(), SQUARE_SIZE);
        let b = bounding_box(&scaled);
        assert!(approx_eq(b.width(), SQUARE_SIZE));
        // Aspect preserved: 90x40 → 250x111.1
        assert!(approx_eq(b.height(), 40.0 * SQUARE_SIZE / 90.0));
    }

    #[test]
    fn test_translate_to_origin() {
        let moved = translate_to_origin(&zigzag());
        let c = centroid(&moved);
        assert!(approx_eq(c.x, 0.0));
        assert!(approx_eq(c.y, 0.0));
    }

    #[test]
    fn test_normalize_is_position_and_scale_independent() {
        let a = normalize(&zigzag(), RESAMPLE_POINTS);
        let shifted: Vec<Point> = zigzag()
            .iter()
            .map(|p| Point::new(p.x * 3.0 + 500.0, p.y * 3.0 - 200.0))
            .collect();
        let b = normalize(&shifted, RESAMPLE_POINTS);
        assert!(path_distance(&a, &b) < 1e-6);
    }

    #[test]
    fn test_path_distance_mismatched_lengths() {
        let a = vec![Point::default(); 3];
        let b = vec![Point::default(); 4];
        assert!(path_distance(&a, &b).is_infinite());
        assert!(path_distance(&[], &[]).is_infinite());
    }

    #[test]
    fn test_distance_at_best_angle_recovers_rotation() {
        let template = normalize(&zigzag(), RESAMPLE_POINTS);
        let tilted = rotate_by(&template, 0.3);
        let plain = path_distance(&tilted, &template);
        let best = distance_at_best_angle(&tilted, &template, std::f64::consts::FRAC_PI_4, 0.01);
        assert!(best < plain);
        assert!(best < 1.0);
    }

    proptest! {
        #[test]
        fn prop_resample_returns_exactly_n(
            coords in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 2..80),
            n in 2usize..128
        ) {
            let points: Vec<Point> = coords.into_iter().map(Point::from).collect();
            prop_assume!(path_length(&points) > 1e-3);
            prop_assert_eq!(resample(&points, n).len(), n);
        }

        #[test]
        fn prop_resample_straight_stroke_is_equidistant(
            steps in prop::collection::vec(0.5f64..25.0, 2..60),
            angle in 0.0f64..std::f64::consts::TAU
        ) {
            let (sin, cos) = angle.sin_cos();
            let mut along = 0.0;
            let mut points = vec![Point::default()];
            for step in steps {
                along += step;
                points.push(Point::new(along * cos, along * sin));
            }
            let out = resample(&points, RESAMPLE_POINTS);
            let interval = along / (RESAMPLE_POINTS - 1) as f64;
            for w in out.windows(2) {
                prop_assert!((w[0].distance_to(w[1]) - interval).abs() < 1e-6 * along.max(1.0));
            }
        }
    }
}
