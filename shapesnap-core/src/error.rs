//! Error types for shape detection.

use thiserror::Error;

use crate::session::DetectionState;

/// Result type for shape detection operations.
pub type StrokeResult<T> = Result<T, StrokeError>;

/// Errors that can occur while configuring or driving shape detection.
///
/// Classification itself never fails: a stroke that cannot be recognized
/// yields [`ShapeKind::None`](crate::ShapeKind::None).
#[derive(Debug, Error)]
pub enum StrokeError {
    /// Classifier strategy name not recognized.
    #[error("Unknown classifier strategy: {0}")]
    UnknownStrategy(String),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Controller call not valid in the current session state.
    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        /// State the controller was in.
        state: DetectionState,
        /// Operation that was rejected.
        action: &'static str,
    },

    /// Template or feedback serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
