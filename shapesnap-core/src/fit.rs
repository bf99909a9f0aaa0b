//! Least-squares primitive fits.

use serde::{Deserialize, Serialize};

use crate::geometry::{centroid, Point, EPSILON};

/// Result of fitting a straight line through a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    /// Extreme projection at the low end of the principal axis.
    pub start: Point,
    /// Extreme projection at the high end of the principal axis.
    pub end: Point,
    /// Unit direction of the principal axis.
    pub direction: Point,
    /// Distance between `start` and `end`.
    pub length: f64,
    /// Root-mean-square distance of the points from the fitted line.
    pub rms_residual: f64,
}

/// Result of fitting a circle through a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    /// Fitted center (the centroid).
    pub center: Point,
    /// Mean distance from the center.
    pub radius: f64,
    /// Root-mean-square deviation from `radius`.
    pub rms_residual: f64,
}

/// Fit a line along the principal eigenvector of the point covariance matrix.
///
/// Returns `None` for fewer than two points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_line(points: &[Point]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }
    let c = centroid(points);
    let n = points.len() as f64;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    sxx /= n;
    sxy /= n;
    syy /= n;

    // Largest eigenvalue of [[sxx, sxy], [sxy, syy]]
    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let lambda = trace / 2.0 + ((trace * trace / 4.0) - det).max(0.0).sqrt();

    let (vx, vy) = if sxy.abs() > EPSILON {
        (lambda - syy, sxy)
    } else if sxx >= syy {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };
    let norm = vx.hypot(vy);
    let direction = Point::new(vx / norm, vy / norm);

    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    let mut residual_sq = 0.0;
    for p in points {
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        let t = dx * direction.x + dy * direction.y;
        t_min = t_min.min(t);
        t_max = t_max.max(t);
        let off = dx * direction.y - dy * direction.x;
        residual_sq += off * off;
    }

    Some(LineFit {
        start: Point::new(c.x + t_min * direction.x, c.y + t_min * direction.y),
        end: Point::new(c.x + t_max * direction.x, c.y + t_max * direction.y),
        direction,
        length: t_max - t_min,
        rms_residual: (residual_sq / n).sqrt(),
    })
}

/// Fit a circle as the centroid plus the mean radius.
///
/// Returns `None` for fewer than three points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_circle(points: &[Point]) -> Option<CircleFit> {
    if points.len() < 3 {
        return None;
    }
    let center = centroid(points);
    let n = points.len() as f64;
    let radius = points.iter().map(|p| p.distance_to(center)).sum::<f64>() / n;
    let variance = points
        .iter()
        .map(|p| (p.distance_to(center) - radius).powi(2))
        .sum::<f64>()
        / n;
    Some(CircleFit {
        center,
        radius,
        rms_residual: variance.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_shapes::{circle, line};

    #[test]
    fn test_fit_line_horizontal() {
        let fit = fit_line(&line(Point::default(), Point::new(100.0, 0.0), 10)).expect("fit");
        assert!((fit.length - 100.0).abs() < 1e-9);
        assert!(fit.rms_residual < 1e-9);
        assert!(fit.direction.y.abs() < 1e-9);
    }

    #[test]
    fn test_fit_line_diagonal() {
        let fit = fit_line(&line(Point::new(10.0, 10.0), Point::new(70.0, 90.0), 20)).expect("fit");
        assert!((fit.length - 100.0).abs() < 1e-6);
        assert!(fit.rms_residual < 1e-6);
    }

    #[test]
    fn test_fit_line_vertical() {
        let fit = fit_line(&line(Point::default(), Point::new(0.0, 50.0), 5)).expect("fit");
        assert!((fit.length - 50.0).abs() < 1e-9);
        assert!(fit.direction.x.abs() < 1e-9);
    }

    #[test]
    fn test_fit_line_needs_two_points() {
        assert!(fit_line(&[Point::default()]).is_none());
    }

    #[test]
    fn test_fit_circle() {
        let fit = fit_circle(&circle(Point::new(5.0, -5.0), 40.0, 64)).expect("fit");
        assert!((fit.radius - 40.0).abs() < 1e-6);
        assert!((fit.center.x - 5.0).abs() < 1e-6);
        assert!(fit.rms_residual < 1e-6);
    }
}
