//! Error handling for LaserKit
//!
//! Provides the error taxonomy shared by every layer of the outline engine:
//! - Geometry errors (parsing, boolean and offset failures, invalid bounds)
//! - Configuration errors (parameters that cannot be clamped)
//! - Build errors (the only failures a build propagates to its caller)
//!
//! All error types use `thiserror` for ergonomic error handling.
//!
//! Lower layers never return `ParseDegenerate`, `BooleanOpFailed`,
//! `OffsetFailed` or `InvalidBounds` as a hard failure. They degrade to the
//! nearest valid geometry and hand the error back as a [`Diagnostic`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geometry error type
///
/// Represents the failure modes of the path, boolean and offset layers.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GeometryError {
    /// Path data could not be fully understood; the offending part was skipped
    #[error("Degenerate path data: {reason}")]
    ParseDegenerate {
        /// What was skipped and why.
        reason: String,
    },

    /// The boolean backend produced nothing usable
    #[error("Boolean {operation} failed: {reason}")]
    BooleanOpFailed {
        /// The operation name (`union`, `difference`, `normalize`).
        operation: String,
        /// Backend specific reason.
        reason: String,
    },

    /// The offset backend produced nothing usable
    #[error("Offset by {delta_mm}mm failed: {reason}")]
    OffsetFailed {
        /// The requested signed offset distance.
        delta_mm: f64,
        /// Backend specific reason.
        reason: String,
    },

    /// A bounding box was non-finite, empty or had non-positive area
    #[error("Invalid bounds after {stage}: {reason}")]
    InvalidBounds {
        /// The pipeline stage that produced the bounds.
        stage: String,
        /// Description of the problem.
        reason: String,
    },

    /// The polygon backend could not be initialized at all
    #[error("Geometry backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl GeometryError {
    /// Creates a boolean failure for `operation`.
    pub fn boolean(operation: &str, reason: impl Into<String>) -> Self {
        Self::BooleanOpFailed {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an offset failure for `delta_mm`.
    pub fn offset(delta_mm: f64, reason: impl Into<String>) -> Self {
        Self::OffsetFailed {
            delta_mm,
            reason: reason.into(),
        }
    }

    /// Creates a degenerate-parse diagnostic.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseDegenerate {
            reason: reason.into(),
        }
    }

    /// Returns true if a build must stop instead of degrading.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

/// Configuration error type
///
/// Raised only for values that have no sensible clamp (NaN, infinity).
/// Everything else is clamped into range during validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is NaN or infinite
    #[error("Parameter '{name}' must be finite, got {value}")]
    NonFinite {
        /// The parameter name.
        name: String,
        /// The rejected value.
        value: f64,
    },

    /// A parameter is outside a range that cannot be clamped
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Build error type
///
/// The only failures an outline build propagates. The caller must show a
/// message and refuse to export.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Build parameters were rejected
    #[error("Invalid build configuration: {0}")]
    Config(#[from] ConfigError),

    /// The geometry backend failed to initialize
    #[error("Geometry backend error: {0}")]
    Backend(#[from] GeometryError),
}

/// A non-fatal problem observed while building an outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The pipeline stage that reported the problem.
    pub stage: String,
    /// The degradation that was applied.
    pub error: GeometryError,
}

impl Diagnostic {
    /// Creates a diagnostic for `stage`.
    pub fn new(stage: impl Into<String>, error: GeometryError) -> Self {
        Self {
            stage: stage.into(),
            error,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}

/// Result type alias for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;
