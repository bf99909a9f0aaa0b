//! User corrections: an append-only log that feeds template learning.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::classify::ShapeKind;
use crate::error::StrokeResult;
use crate::features::{apply_virtual_closure, closed_outline};
use crate::geometry::Point;
use crate::templates::TemplateStore;

/// One user correction of a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// What the classifier said.
    pub detected_type: ShapeKind,
    /// How confident it was.
    pub detected_confidence: f64,
    /// What the user said it should have been.
    pub corrected_type: ShapeKind,
    /// The raw stroke.
    pub stroke: Vec<Point>,
}

impl FeedbackRecord {
    /// Whether the user disagreed with the classifier.
    #[must_use]
    pub fn is_correction(&self) -> bool {
        self.detected_type != self.corrected_type
    }
}

/// Accuracy figures for one detected label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Records with this detected label.
    pub total: usize,
    /// How many of them the user corrected.
    pub corrections: usize,
    /// `1 - corrections / total`.
    pub accuracy: f64,
}

/// Aggregate accuracy over the feedback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Number of records.
    pub total: usize,
    /// Records where the corrected type differs from the detected one.
    pub corrections: usize,
    /// `1 - corrections / total`, or 1.0 for an empty log.
    pub accuracy: f64,
    /// Per detected label.
    pub per_label: BTreeMap<ShapeKind, LabelStats>,
}

#[allow(clippy::cast_precision_loss)]
fn accuracy(total: usize, corrections: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        1.0 - corrections as f64 / total as f64
    }
}

/// Feedback log plus the template store it teaches.
///
/// Clones share the same log and template store.
#[derive(Debug, Clone, Default)]
pub struct FeedbackStore {
    records: Arc<RwLock<Vec<FeedbackRecord>>>,
    templates: TemplateStore,
}

impl FeedbackStore {
    /// Create a store that appends learned templates to `templates`.
    #[must_use]
    pub fn new(templates: TemplateStore) -> Self {
        Self {
            records: Arc::default(),
            templates,
        }
    }

    /// The template store corrections are learned into.
    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Log a user's verdict on a classification.
    ///
    /// When the user picked a different shape, the stroke (closed virtually
    /// if it nearly closes) is normalized and added as a template for the
    /// corrected shape.
    pub fn record_correction(
        &self,
        detected_type: ShapeKind,
        detected_confidence: f64,
        corrected_type: ShapeKind,
        stroke: &[Point],
    ) -> FeedbackRecord {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            timestamp_ms,
            detected_type,
            detected_confidence,
            corrected_type,
            stroke: stroke.to_vec(),
        };

        if record.is_correction() && corrected_type != ShapeKind::None && !stroke.is_empty() {
            let learned = closed_outline(stroke).unwrap_or_else(|| apply_virtual_closure(stroke));
            self.templates.add_stroke(corrected_type, &learned);
            info!(
                detected = %detected_type,
                corrected = %corrected_type,
                templates = self.templates.count(corrected_type),
                "learned template from correction"
            );
        }

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        record
    }

    /// Aggregate accuracy over every record.
    #[must_use]
    pub fn compute_stats(&self) -> FeedbackStats {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut per_label: BTreeMap<ShapeKind, (usize, usize)> = BTreeMap::new();
        let mut corrections = 0;
        for record in records.iter() {
            let entry = per_label.entry(record.detected_type).or_insert((0, 0));
            entry.0 += 1;
            if record.is_correction() {
                entry.1 += 1;
                corrections += 1;
            }
        }
        FeedbackStats {
            total: records.len(),
            corrections,
            accuracy: accuracy(records.len(), corrections),
            per_label: per_label
                .into_iter()
                .map(|(kind, (total, corrections))| {
                    (
                        kind,
                        LabelStats {
                            total,
                            corrections,
                            accuracy: accuracy(total, corrections),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Copy of the log.
    #[must_use]
    pub fn export_records(&self) -> Vec<FeedbackRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The log as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> StrokeResult<String> {
        Ok(serde_json::to_string(&self.export_records())?)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record. Learned templates stay.
    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_shapes::{circle, square};

    #[test]
    fn test_empty_stats() {
        let stats = FeedbackStore::new(TemplateStore::new()).compute_stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.corrections, 0);
        assert!((stats.accuracy - 1.0).abs() < f64::EPSILON);
        assert!(stats.per_label.is_empty());
    }

    #[test]
    fn test_correction_adds_template() {
        let templates = TemplateStore::with_defaults();
        let store = FeedbackStore::new(templates.clone());
        let record = store.record_correction(
            ShapeKind::Circle,
            0.6,
            ShapeKind::Square,
            &square(Point::default(), 80.0),
        );
        assert!(record.is_correction());
        assert_eq!(templates.count(ShapeKind::Square), 2);
        assert_eq!(store.compute_stats().corrections, 1);
    }

    #[test]
    fn test_confirmation_does_not_learn() {
        let templates = TemplateStore::with_defaults();
        let store = FeedbackStore::new(templates.clone());
        store.record_correction(ShapeKind::Circle, 0.9, ShapeKind::Circle, &circle(Point::default(), 50.0, 32));
        assert_eq!(templates.count(ShapeKind::Circle), 1);
        let stats = store.compute_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.corrections, 0);
    }

    #[test]
    fn test_correction_to_none_does_not_learn() {
        let templates = TemplateStore::with_defaults();
        let store = FeedbackStore::new(templates.clone());
        store.record_correction(ShapeKind::Circle, 0.4, ShapeKind::None, &circle(Point::default(), 50.0, 32));
        assert_eq!(templates.len(), ShapeKind::ALL.len());
        assert_eq!(store.compute_stats().corrections, 1);
    }

    #[test]
    fn test_per_label_stats() {
        let store = FeedbackStore::new(TemplateStore::new());
        let stroke = square(Point::default(), 50.0);
        store.record_correction(ShapeKind::Circle, 0.7, ShapeKind::Circle, &stroke);
        store.record_correction(ShapeKind::Circle, 0.5, ShapeKind::Square, &stroke);
        store.record_correction(ShapeKind::Line, 0.9, ShapeKind::Line, &stroke);
        store.record_correction(ShapeKind::Circle, 0.5, ShapeKind::Oval, &stroke);

        let stats = store.compute_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.corrections, 2);
        assert!((stats.accuracy - 0.5).abs() < 1e-12);
        let circle = stats.per_label[&ShapeKind::Circle];
        assert_eq!((circle.total, circle.corrections), (3, 2));
        assert!((circle.accuracy - 1.0 / 3.0).abs() < 1e-12);
        assert!((stats.per_label[&ShapeKind::Line].accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_export_and_clear() {
        let templates = TemplateStore::with_defaults();
        let store = FeedbackStore::new(templates.clone());
        store.record_correction(ShapeKind::Line, 0.8, ShapeKind::Rectangle, &square(Point::default(), 50.0));
        assert_eq!(store.export_records().len(), 1);
        let json = store.export_json().expect("serialize");
        assert!(json.contains("\"corrected_type\":\"rectangle\""));

        store.clear();
        assert!(store.is_empty());
        assert_eq!(templates.count(ShapeKind::Rectangle), 2);
    }
}
