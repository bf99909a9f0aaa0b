//! Idealized shapes: the clean primitive that replaces a recognized stroke.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::classify::{ClassificationResult, ShapeKind};
use crate::features::{extreme_points, first_mid_last};
use crate::geometry::{bounding_box, triangle_area, Point, EPSILON};

/// Segments used to tessellate circles and ovals.
pub const ARC_SEGMENTS: usize = 36;

/// Triangle corners closer than this fraction of the stroke size are merged.
const CORNER_MERGE: f64 = 0.1;

/// A parametric primitive, positioned where the stroke was drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IdealizedShape {
    /// Circle.
    Circle {
        /// Center point.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// Axis-aligned ellipse.
    Oval {
        /// Center point.
        center: Point,
        /// Horizontal diameter.
        width: f64,
        /// Vertical diameter.
        height: f64,
    },
    /// Axis-aligned square (`width == height`).
    Square {
        /// Center point.
        center: Point,
        /// Side length.
        width: f64,
        /// Side length.
        height: f64,
    },
    /// Axis-aligned rectangle.
    Rectangle {
        /// Center point.
        center: Point,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Triangle.
    Triangle {
        /// Corners.
        points: [Point; 3],
    },
    /// Straight segment.
    Line {
        /// Endpoints.
        points: [Point; 2],
    },
}

impl IdealizedShape {
    /// The kind this shape realizes.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Oval { .. } => ShapeKind::Oval,
            Self::Square { .. } => ShapeKind::Square,
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Triangle { .. } => ShapeKind::Triangle,
            Self::Line { .. } => ShapeKind::Line,
        }
    }

    /// Flatten into a renderable polyline.
    ///
    /// Every shape but a line comes back closed, with the first point
    /// repeated at the end. Circles and ovals use [`ARC_SEGMENTS`] segments.
    #[must_use]
    pub fn to_polyline(&self) -> Vec<Point> {
        match *self {
            Self::Circle { center, radius } => arc(center, radius, radius),
            Self::Oval {
                center,
                width,
                height,
            } => arc(center, width / 2.0, height / 2.0),
            Self::Square {
                center,
                width,
                height,
            }
            | Self::Rectangle {
                center,
                width,
                height,
            } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                vec![
                    Point::new(center.x - hw, center.y - hh),
                    Point::new(center.x + hw, center.y - hh),
                    Point::new(center.x + hw, center.y + hh),
                    Point::new(center.x - hw, center.y + hh),
                    Point::new(center.x - hw, center.y - hh),
                ]
            }
            Self::Triangle { points: [a, b, c] } => vec![a, b, c, a],
            Self::Line { points: [a, b] } => vec![a, b],
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn arc(center: Point, rx: f64, ry: f64) -> Vec<Point> {
    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = TAU * (i % ARC_SEGMENTS) as f64 / ARC_SEGMENTS as f64;
            Point::new(center.x + rx * t.cos(), center.y + ry * t.sin())
        })
        .collect()
}

/// Build the idealized shape for a classification of `stroke`.
///
/// Geometry comes from the raw, unnormalized stroke so the shape lands where
/// it was drawn. Returns `None` for [`ShapeKind::None`] or an empty stroke.
#[must_use]
pub fn synthesize(result: &ClassificationResult, stroke: &[Point]) -> Option<IdealizedShape> {
    let (&first, &last) = (stroke.first()?, stroke.last()?);
    let bounds = bounding_box(stroke);
    let center = bounds.center();
    let (width, height) = (bounds.width(), bounds.height());

    let shape = match result.kind {
        ShapeKind::Circle => IdealizedShape::Circle {
            center,
            radius: bounds.max_side() / 2.0,
        },
        ShapeKind::Oval => IdealizedShape::Oval {
            center,
            width,
            height,
        },
        ShapeKind::Square => IdealizedShape::Square {
            center,
            width: bounds.max_side(),
            height: bounds.max_side(),
        },
        ShapeKind::Rectangle => IdealizedShape::Rectangle {
            center,
            width,
            height,
        },
        ShapeKind::Triangle => IdealizedShape::Triangle {
            points: triangle_corners(stroke, bounds.max_side())?,
        },
        ShapeKind::Line => IdealizedShape::Line {
            points: [first, last],
        },
        ShapeKind::None => return None,
    };
    Some(shape)
}

/// Three corners picked from the stroke's extremes.
///
/// When the extremes collapse to fewer than three distinct points, falls
/// back to the first, middle and last point.
fn triangle_corners(stroke: &[Point], size: f64) -> Option<[Point; 3]> {
    let extremes = extreme_points(stroke, CORNER_MERGE * size);
    if extremes.len() >= 3 {
        let mut best = [extremes[0], extremes[1], extremes[2]];
        let mut best_area = triangle_area(best[0], best[1], best[2]);
        for i in 0..extremes.len() {
            for j in (i + 1)..extremes.len() {
                for k in (j + 1)..extremes.len() {
                    let area = triangle_area(extremes[i], extremes[j], extremes[k]);
                    if area > best_area {
                        best = [extremes[i], extremes[j], extremes[k]];
                        best_area = area;
                    }
                }
            }
        }
        if best_area > EPSILON {
            return Some(best);
        }
    }
    first_mid_last(stroke).or_else(|| {
        let first = stroke.first()?;
        Some([*first; 3])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_shapes::{circle, rectangle, triangle};

    fn result(kind: ShapeKind) -> ClassificationResult {
        ClassificationResult::new(kind, 0.9)
    }

    #[test]
    fn test_circle_from_bounds() {
        let stroke = circle(Point::new(40.0, -20.0), 100.0, 64);
        let Some(IdealizedShape::Circle { center, radius }) = synthesize(&result(ShapeKind::Circle), &stroke) else {
            panic!("expected circle");
        };
        assert!((radius - 100.0).abs() < 1.0);
        assert!(center.distance_to(Point::new(40.0, -20.0)) < 1.0);
    }

    #[test]
    fn test_square_forces_equal_sides() {
        let stroke = rectangle(Point::default(), 100.0, 80.0);
        let Some(IdealizedShape::Square { width, height, .. }) = synthesize(&result(ShapeKind::Square), &stroke) else {
            panic!("expected square");
        };
        assert!((width - 100.0).abs() < 1e-9);
        assert!((height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rectangle_keeps_bounds() {
        let stroke = rectangle(Point::new(10.0, 10.0), 200.0, 100.0);
        let shape = synthesize(&result(ShapeKind::Rectangle), &stroke);
        assert_eq!(
            shape,
            Some(IdealizedShape::Rectangle {
                center: Point::new(110.0, 60.0),
                width: 200.0,
                height: 100.0,
            })
        );
    }

    #[test]
    fn test_triangle_uses_extremes() {
        let stroke = triangle(Point::default(), 100.0);
        let Some(IdealizedShape::Triangle { points }) = synthesize(&result(ShapeKind::Triangle), &stroke) else {
            panic!("expected triangle");
        };
        let area = triangle_area(points[0], points[1], points[2]);
        // Equilateral triangle with circumradius 100
        let expected = 3.0 * 3.0_f64.sqrt() / 4.0 * 100.0 * 100.0;
        assert!((area - expected).abs() / expected < 0.05);
    }

    #[test]
    fn test_triangle_falls_back_to_first_mid_last() {
        let stroke = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let corners = triangle_corners(&stroke, 2.0).expect("corners");
        assert_eq!(corners, [stroke[0], stroke[1], stroke[2]]);
    }

    #[test]
    fn test_line_uses_raw_endpoints() {
        let stroke = vec![Point::new(3.0, 4.0), Point::new(50.0, 5.0), Point::new(100.0, 3.0)];
        assert_eq!(
            synthesize(&result(ShapeKind::Line), &stroke),
            Some(IdealizedShape::Line {
                points: [Point::new(3.0, 4.0), Point::new(100.0, 3.0)]
            })
        );
    }

    #[test]
    fn test_none_and_empty() {
        assert!(synthesize(&ClassificationResult::none(), &circle(Point::default(), 10.0, 16)).is_none());
        assert!(synthesize(&result(ShapeKind::Circle), &[]).is_none());
    }

    #[test]
    fn test_polylines() {
        let circle = IdealizedShape::Circle {
            center: Point::default(),
            radius: 10.0,
        };
        let points = circle.to_polyline();
        assert_eq!(points.len(), ARC_SEGMENTS + 1);
        assert_eq!(points.first(), points.last());
        assert!(points.iter().all(|p| (p.distance_to(Point::default()) - 10.0).abs() < 1e-9));

        let square = IdealizedShape::Square {
            center: Point::default(),
            width: 4.0,
            height: 4.0,
        };
        assert_eq!(square.to_polyline().len(), 5);

        let tri = IdealizedShape::Triangle {
            points: [Point::default(), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
        };
        let outline = tri.to_polyline();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline.first(), outline.last());

        let line = IdealizedShape::Line {
            points: [Point::default(), Point::new(5.0, 5.0)],
        };
        assert_eq!(line.to_polyline().len(), 2);
    }

    #[test]
    fn test_serde_tagging() {
        let shape = IdealizedShape::Circle {
            center: Point::new(1.0, 2.0),
            radius: 3.0,
        };
        let json = serde_json::to_value(&shape).expect("serialize");
        assert_eq!(json["type"], "circle");
        assert_eq!(json["radius"], 3.0);
        assert_eq!(shape.kind(), ShapeKind::Circle);
    }
}
