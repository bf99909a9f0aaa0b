//! # Shapesnap Core
//!
//! Recognizes hand-drawn strokes as geometric primitives and replaces them
//! with clean, idealized shapes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   shapesnap-core                    │
//! ├─────────────────────────────────────────────────────┤
//! │  Session Controller     │  Classifiers              │
//! │  - Pointer events       │  - Rule-based detectors   │
//! │  - Hold timer           │  - Hull-ratio tree        │
//! │  - Preview / commit     │  - Template matching      │
//! ├─────────────────────────────────────────────────────┤
//! │  Normalizer & Features  │  Templates & Feedback     │
//! │  - Resample / rotate    │  - Shared template store  │
//! │  - Hull, min rectangle  │  - Correction learning    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use shapesnap_core::{
//!     build_classifier, synthesize, Classifier, DetectorConfig, Point, ShapeKind, TemplateStore,
//! };
//!
//! let stroke: Vec<Point> = (0..64)
//!     .map(|i| {
//!         let t = std::f64::consts::TAU * f64::from(i) / 64.0;
//!         Point::new(100.0 * t.cos(), 100.0 * t.sin())
//!     })
//!     .collect();
//!
//! let classifier = build_classifier(&DetectorConfig::default(), TemplateStore::with_defaults());
//! let result = classifier.classify(&stroke);
//! assert_eq!(result.kind, ShapeKind::Circle);
//! assert!(synthesize(&result, &stroke).is_some());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod features;
pub mod feedback;
pub mod fit;
pub mod geometry;
pub mod normalize;
pub mod session;
pub mod synth;
pub mod templates;
pub mod timer;

pub use classify::{
    build_classifier, ClassificationResult, Classifier, ClassifierKind, HullClassifier,
    RuleClassifier, ShapeKind, TemplateClassifier,
};
pub use config::{DetectorConfig, RuleThresholds, TemplateTuning};
pub use error::{StrokeError, StrokeResult};
pub use event::{PointerEvent, PointerPhase};
pub use features::StrokeFeatures;
pub use feedback::{FeedbackRecord, FeedbackStats, FeedbackStore, LabelStats};
pub use geometry::{Bounds, Point};
pub use session::{CommittedShape, DetectionState, SessionController, SessionId, ShapePreview};
pub use synth::{synthesize, IdealizedShape};
pub use templates::{Template, TemplateStore};
pub use timer::{HoldScheduler, ManualScheduler, ScheduledTask, TimerTicket, TokioScheduler};

/// Shapesnap core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
