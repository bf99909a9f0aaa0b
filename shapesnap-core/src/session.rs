//! # Detection Session
//!
//! The state machine that turns host pointer input into a shape preview and,
//! on confirmation, a committed idealized shape.
//!
//! ```text
//!            start_detection          end_detection          hold timer
//!   Idle ───────────────────► Collecting ─────────► PendingHold ─────────► PreviewReady
//!    ▲                          │  ▲ add_point          │ (no shape)            │
//!    │                          │  └──────┘             ▼                       │
//!    └──────────────────────────┴────────────────── Idle ◄──── apply / cancel ──┘
//! ```
//!
//! `start_detection` is legal from every state and discards whatever was in
//! progress. At most one hold timer is armed at a time.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::{build_classifier, ClassificationResult, Classifier, ShapeKind};
use crate::config::DetectorConfig;
use crate::error::{StrokeError, StrokeResult};
use crate::event::{PointerEvent, PointerPhase};
use crate::geometry::Point;
use crate::synth::{synthesize, IdealizedShape};
use crate::templates::TemplateStore;
use crate::timer::{HoldScheduler, ScheduledTask, TimerTicket};

/// Minimum number of points a stroke needs before it is classified.
pub const MIN_STROKE_POINTS: usize = 3;

/// Unique identifier for one detection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new unique session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionState {
    /// No stroke in progress.
    Idle,
    /// Accumulating points.
    Collecting,
    /// Stroke finished; waiting for the hold timer.
    PendingHold,
    /// A preview is ready to apply or cancel.
    PreviewReady,
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::PendingHold => "pending-hold",
            Self::PreviewReady => "preview-ready",
        })
    }
}

/// What the host renders while the user decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePreview {
    /// Recognized kind.
    pub kind: ShapeKind,
    /// Classifier confidence.
    pub confidence: f64,
    /// The idealized shape.
    pub shape: IdealizedShape,
    /// The shape flattened for drawing.
    pub polyline: Vec<Point>,
}

/// A confirmed shape for the host to splice in place of the raw stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedShape {
    /// Session that produced the shape.
    pub session: SessionId,
    /// Recognized kind.
    pub kind: ShapeKind,
    /// Classifier confidence.
    pub confidence: f64,
    /// The idealized shape.
    pub shape: IdealizedShape,
    /// Replacement polyline.
    pub polyline: Vec<Point>,
    /// The raw stroke being replaced.
    pub original: Vec<Point>,
}

/// Drives detection for one pointer at a time.
pub struct SessionController {
    id: SessionId,
    state: DetectionState,
    config: DetectorConfig,
    classifier: Box<dyn Classifier>,
    scheduler: Box<dyn HoldScheduler>,
    stroke: Vec<Point>,
    timer: Option<(TimerTicket, Box<dyn ScheduledTask>)>,
    next_ticket: u64,
    preview: Option<ShapePreview>,
    last_result: Option<ClassificationResult>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("classifier", &self.classifier.name())
            .field("points", &self.stroke.len())
            .field("timer", &self.timer.as_ref().map(|(ticket, _)| *ticket))
            .field("preview", &self.preview.as_ref().map(|p| p.kind))
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller using the classifier `config` selects.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfig`] if the configuration is out of
    /// range, so a bad setup fails before any stroke is drawn.
    pub fn new(
        config: DetectorConfig,
        templates: TemplateStore,
        scheduler: Box<dyn HoldScheduler>,
    ) -> StrokeResult<Self> {
        let classifier = build_classifier(&config, templates);
        Self::with_classifier(config, classifier, scheduler)
    }

    /// Create a controller around a caller-supplied classifier.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfig`] if the configuration is out of range.
    pub fn with_classifier(
        config: DetectorConfig,
        classifier: Box<dyn Classifier>,
        scheduler: Box<dyn HoldScheduler>,
    ) -> StrokeResult<Self> {
        config.validate()?;
        debug!(classifier = classifier.name(), hold_delay_ms = config.hold_delay_ms, "session controller ready");
        Ok(Self {
            id: SessionId::new(),
            state: DetectionState::Idle,
            config,
            classifier,
            scheduler,
            stroke: Vec::new(),
            timer: None,
            next_ticket: 0,
            preview: None,
            last_result: None,
        })
    }

    /// Current session ID. A new one is issued by every [`start_detection`](Self::start_detection).
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Points accumulated so far.
    #[must_use]
    pub fn stroke(&self) -> &[Point] {
        &self.stroke
    }

    /// The pending preview, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&ShapePreview> {
        self.preview.as_ref()
    }

    /// Result of the most recent classification, including rejected ones.
    #[must_use]
    pub fn last_result(&self) -> Option<ClassificationResult> {
        self.last_result
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Name of the classifier in use.
    #[must_use]
    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// The armed timer's ticket, if one is outstanding.
    #[must_use]
    pub fn armed_ticket(&self) -> Option<TimerTicket> {
        self.timer.as_ref().map(|(ticket, _)| *ticket)
    }

    /// Begin a new stroke, abandoning any stroke, timer or preview in progress.
    pub fn start_detection(&mut self) -> SessionId {
        self.reset();
        self.id = SessionId::new();
        self.state = DetectionState::Collecting;
        debug!(session = %self.id, "detection started");
        self.id
    }

    /// Append a point to the stroke being collected.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidTransition`] unless the session is collecting.
    pub fn add_point(&mut self, point: Point) -> StrokeResult<()> {
        self.expect_state(DetectionState::Collecting, "add a point")?;
        self.stroke.push(point);
        Ok(())
    }

    /// Finish the stroke and arm the hold timer.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidTransition`] unless the session is collecting.
    pub fn end_detection(&mut self) -> StrokeResult<TimerTicket> {
        self.expect_state(DetectionState::Collecting, "end detection")?;
        self.cancel_timer();
        self.next_ticket += 1;
        let ticket = TimerTicket::new(self.next_ticket);
        let task = self.scheduler.schedule(self.config.hold_delay(), ticket);
        self.timer = Some((ticket, task));
        self.state = DetectionState::PendingHold;
        debug!(session = %self.id, %ticket, points = self.stroke.len(), "hold timer armed");
        Ok(ticket)
    }

    /// Handle a fired hold timer.
    ///
    /// A ticket that is not the armed one (the stroke was restarted or
    /// cancelled meanwhile) is ignored. Otherwise the stroke is classified:
    /// a confident result moves the session to
    /// [`DetectionState::PreviewReady`], anything else back to
    /// [`DetectionState::Idle`].
    pub fn on_timer(&mut self, ticket: TimerTicket) -> Option<ShapePreview> {
        if self.state != DetectionState::PendingHold || self.armed_ticket() != Some(ticket) {
            debug!(session = %self.id, %ticket, state = %self.state, "ignoring stale hold timer");
            return None;
        }
        self.timer = None;

        let preview = self.classify_stroke();
        match preview {
            Some(preview) => {
                debug!(
                    session = %self.id,
                    kind = ?preview.kind,
                    confidence = preview.confidence,
                    "preview ready"
                );
                self.preview = Some(preview.clone());
                self.state = DetectionState::PreviewReady;
                Some(preview)
            }
            None => {
                debug!(session = %self.id, "no shape detected");
                self.stroke.clear();
                self.state = DetectionState::Idle;
                None
            }
        }
    }

    /// Accept the preview.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidTransition`] unless a preview is ready.
    pub fn apply_shape(&mut self) -> StrokeResult<CommittedShape> {
        self.expect_state(DetectionState::PreviewReady, "apply a shape")?;
        let Some(preview) = self.preview.take() else {
            return Err(StrokeError::InvalidTransition {
                state: self.state,
                action: "apply a shape",
            });
        };
        let committed = CommittedShape {
            session: self.id,
            kind: preview.kind,
            confidence: preview.confidence,
            shape: preview.shape,
            polyline: preview.polyline,
            original: std::mem::take(&mut self.stroke),
        };
        self.reset();
        debug!(session = %committed.session, kind = ?committed.kind, "shape committed");
        Ok(committed)
    }

    /// Abandon whatever is in progress. Returns `false` if the session was already idle.
    ///
    /// The raw stroke is left for the host to keep or discard.
    pub fn cancel_shape(&mut self) -> bool {
        if self.state == DetectionState::Idle {
            return false;
        }
        debug!(session = %self.id, state = %self.state, "detection cancelled");
        self.reset();
        true
    }

    /// Route a host pointer event.
    ///
    /// `Start` begins a stroke at the event position, `Move` extends it,
    /// `End` adds the final position and arms the hold timer (returning its
    /// ticket), and `Cancel` abandons the gesture.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidTransition`] for `Move` or `End` outside
    /// a stroke.
    pub fn process_event(&mut self, event: &PointerEvent) -> StrokeResult<Option<TimerTicket>> {
        let point = event.point();
        match event.phase {
            PointerPhase::Start => {
                self.start_detection();
                self.add_point(point)?;
                Ok(None)
            }
            PointerPhase::Move => {
                self.add_point(point)?;
                Ok(None)
            }
            PointerPhase::End => {
                if self.state == DetectionState::Collecting && self.stroke.last() != Some(&point) {
                    self.stroke.push(point);
                }
                self.end_detection().map(Some)
            }
            PointerPhase::Cancel => {
                self.cancel_shape();
                Ok(None)
            }
        }
    }

    fn classify_stroke(&mut self) -> Option<ShapePreview> {
        if self.stroke.len() < MIN_STROKE_POINTS {
            self.last_result = Some(ClassificationResult::none());
            return None;
        }
        let result = self.classifier.classify(&self.stroke);
        self.last_result = Some(result);
        if !result.is_shape() || result.confidence <= self.config.min_preview_confidence {
            return None;
        }
        let shape = synthesize(&result, &self.stroke)?;
        Some(ShapePreview {
            kind: result.kind,
            confidence: result.confidence,
            polyline: shape.to_polyline(),
            shape,
        })
    }

    fn expect_state(&self, expected: DetectionState, action: &'static str) -> StrokeResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            warn!(session = %self.id, state = %self.state, action, "rejected session call");
            Err(StrokeError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn cancel_timer(&mut self) {
        if let Some((ticket, mut task)) = self.timer.take() {
            task.cancel();
            debug!(session = %self.id, %ticket, "hold timer cancelled");
        }
    }

    fn reset(&mut self) {
        self.cancel_timer();
        self.preview = None;
        self.stroke.clear();
        self.state = DetectionState::Idle;
    }
}
