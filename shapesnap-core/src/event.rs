//! Pointer events delivered by the host canvas.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Pointer went down; a new stroke begins.
    Start,
    /// Pointer moved while down.
    Move,
    /// Pointer lifted; the stroke is complete.
    End,
    /// The gesture was aborted (e.g., palm rejection).
    Cancel,
}

/// A single pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in canvas coordinates.
    pub x: f64,
    /// Y position in canvas coordinates.
    pub y: f64,
    /// Timestamp in milliseconds since canvas start.
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub fn new(phase: PointerPhase, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            phase,
            x,
            y,
            timestamp_ms,
        }
    }

    /// The event position.
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Expand a recorded stroke into the event sequence a host would send:
    /// `Start` on the first point, `Move` on the rest, `End` on the last.
    ///
    /// Timestamps advance by `interval_ms` per point.
    #[must_use]
    pub fn from_stroke(points: &[Point], interval_ms: u64) -> Vec<Self> {
        let mut events = Vec::with_capacity(points.len() + 1);
        let mut timestamp_ms = 0;
        for (i, p) in points.iter().enumerate() {
            let phase = if i == 0 {
                PointerPhase::Start
            } else {
                PointerPhase::Move
            };
            events.push(Self::new(phase, p.x, p.y, timestamp_ms));
            timestamp_ms += interval_ms;
        }
        if let Some(last) = points.last() {
            events.push(Self::new(PointerPhase::End, last.x, last.y, timestamp_ms));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_event_serialization() {
        let event = PointerEvent::new(PointerPhase::Move, 1.5, 2.5, 16);
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"phase\":\"move\""));
        let back: PointerEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_from_stroke() {
        let points = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 1.0)];
        let events = PointerEvent::from_stroke(&points, 8);
        let phases: Vec<PointerPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                PointerPhase::Start,
                PointerPhase::Move,
                PointerPhase::Move,
                PointerPhase::End
            ]
        );
        assert_eq!(events[3].point(), Point::new(2.0, 1.0));
        assert_eq!(events[3].timestamp_ms, 24);
    }

    #[test]
    fn test_from_empty_stroke() {
        assert!(PointerEvent::from_stroke(&[], 8).is_empty());
    }
}
