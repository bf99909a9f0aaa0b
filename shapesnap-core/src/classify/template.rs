//! Template classifier: nearest normalized template per label, corrected by
//! stroke features.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use super::{ClassificationResult, Classifier, ShapeKind};
use crate::config::TemplateTuning;
use crate::features::{closed_outline, StrokeFeatures};
use crate::geometry::{bounding_box, path_length, Point, EPSILON};
use crate::normalize::{
    distance_at_best_angle, normalize_resampled, path_distance, resample, RESAMPLE_POINTS,
};
use crate::templates::TemplateStore;

/// Matches strokes against the templates in a [`TemplateStore`].
///
/// Closed strokes are compared at every starting offset along the outline
/// and in both drawing directions, open strokes in both directions, so the
/// result does not depend on where or which way the user started drawing.
#[derive(Debug, Clone)]
pub struct TemplateClassifier {
    templates: TemplateStore,
    tuning: TemplateTuning,
}

impl TemplateClassifier {
    /// Create a classifier reading from `templates`.
    #[must_use]
    pub fn new(templates: TemplateStore, tuning: TemplateTuning) -> Self {
        Self { templates, tuning }
    }

    /// The store this classifier reads.
    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Best raw score per label, before feature correction.
    #[must_use]
    pub fn label_scores(&self, points: &[Point]) -> BTreeMap<ShapeKind, f64> {
        let candidates = candidate_clouds(points);
        let mut scores: BTreeMap<ShapeKind, f64> = BTreeMap::new();
        if candidates.is_empty() {
            return scores;
        }

        for template in self.templates.templates() {
            let half_diagonal = bounding_box(&template.points).diagonal() / 2.0;
            if template.points.len() != RESAMPLE_POINTS || half_diagonal < EPSILON {
                continue;
            }
            let Some((best, distance)) = candidates
                .iter()
                .map(|c| (c, path_distance(c, &template.points)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            else {
                continue;
            };
            let distance = if self.tuning.angle_search {
                distance.min(distance_at_best_angle(
                    best,
                    &template.points,
                    self.tuning.angle_range_deg.to_radians(),
                    self.tuning.angle_precision_deg.to_radians(),
                ))
            } else {
                distance
            };

            let score = (1.0 - distance / half_diagonal).clamp(0.0, 1.0);
            let entry = scores.entry(template.label).or_insert(0.0);
            *entry = entry.max(score);
        }
        scores
    }
}

impl Classifier for TemplateClassifier {
    fn classify(&self, points: &[Point]) -> ClassificationResult {
        if points.len() < 3 || path_length(points) < EPSILON {
            return ClassificationResult::none();
        }
        let features = StrokeFeatures::extract(points);
        let scores = self.label_scores(points);

        let best = scores
            .into_iter()
            .map(|(kind, score)| (kind, score * correction(kind, &features, self.tuning.open_stroke_penalty)))
            .inspect(|(kind, score)| debug!(kind = ?kind, score, "template label score"))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        match best {
            Some((kind, score)) if score >= self.tuning.min_score => {
                ClassificationResult::new(kind, score)
            }
            _ => ClassificationResult::none(),
        }
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

/// Normalized versions of the stroke to compare against templates.
fn candidate_clouds(points: &[Point]) -> Vec<Vec<Point>> {
    if let Some(outline) = closed_outline(points) {
        let mut ring = resample(&outline, RESAMPLE_POINTS);
        ring.pop();
        let reversed: Vec<Point> = ring.iter().rev().copied().collect();
        let n = ring.len();
        [ring, reversed]
            .iter()
            .flat_map(|direction| {
                (0..n).map(move |shift| {
                    let mut shifted: Vec<Point> = direction[shift..]
                        .iter()
                        .chain(&direction[..shift])
                        .copied()
                        .collect();
                    shifted.push(shifted[0]);
                    normalize_resampled(&shifted)
                })
            })
            .collect()
    } else {
        let forward = resample(points, RESAMPLE_POINTS);
        let backward: Vec<Point> = forward.iter().rev().copied().collect();
        vec![normalize_resampled(&forward), normalize_resampled(&backward)]
    }
}

/// Multiplicative boost or penalty for `kind` given the stroke's features.
/// Closed kinds on an open stroke are scaled by `open_penalty`.
fn correction(kind: ShapeKind, f: &StrokeFeatures, open_penalty: f64) -> f64 {
    let mut factor = 1.0;
    let mut apply = |condition: bool, multiplier: f64| {
        if condition {
            factor *= multiplier;
        }
    };
    let corners = f.corner_count;
    let aspect = f.aspect_ratio;

    match kind {
        ShapeKind::Line => {
            apply(f.closed, 0.3);
            apply(corners > 3, 0.3);
            apply(aspect > 0.3, 0.4);
        }
        ShapeKind::Circle => {
            apply(f.closed, 1.1);
            apply((3..=5).contains(&corners), 0.75);
            apply(aspect < 0.75, 0.7);
        }
        ShapeKind::Oval => {
            apply(f.closed, 1.1);
            apply(aspect > 0.9, 0.85);
            apply(aspect < 0.3, 0.6);
        }
        ShapeKind::Square => {
            apply(f.closed, 1.1);
            apply((4..=5).contains(&corners), 1.1);
            apply(!(4..=5).contains(&corners), 0.8);
            apply(aspect < 0.7, 0.7);
        }
        ShapeKind::Rectangle => {
            apply(f.closed, 1.1);
            apply((4..=5).contains(&corners), 1.1);
            apply(!(4..=5).contains(&corners), 0.8);
            apply(aspect > 0.9, 0.8);
        }
        ShapeKind::Triangle => {
            apply(f.closed, 1.1);
            apply(corners == 3, 1.15);
            apply(corners > 4, 0.8);
        }
        ShapeKind::None => return 0.0,
    }
    if kind.is_closed() && !f.closed {
        factor *= open_penalty;
    }
    factor
}
