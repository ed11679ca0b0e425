//! Error types shared by grading engines and their callers.

use thiserror::Error;

/// Result type for core value parsing.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing core values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Grading space name not recognized.
    #[error("unknown grading space: {name} (expected linear, log or video)")]
    UnknownGradingSpace {
        /// Name that failed to parse.
        name: String,
    },
}

/// Result type for engine compilation.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors a color engine reports while compiling a node list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Color space (or role) not found in the catalog.
    #[error("color space not found: {name}")]
    ColorSpaceNotFound {
        /// Name of the missing color space.
        name: String,
    },

    /// Display not found in the catalog.
    #[error("display not found: {name}")]
    DisplayNotFound {
        /// Name of the missing display.
        name: String,
    },

    /// View not found for display.
    #[error("view '{view}' not found for display '{display}'")]
    ViewNotFound {
        /// Display name.
        display: String,
        /// View name.
        view: String,
    },

    /// Look not found in the catalog.
    #[error("look not found: {name}")]
    LookNotFound {
        /// Name of the missing look.
        name: String,
    },

    /// Look requested in inverse direction has no inverse.
    #[error("look '{name}' cannot be applied in inverse direction")]
    LookNotInvertible {
        /// Name of the look.
        name: String,
    },

    /// Lookup table data does not match its declared shape.
    #[error("invalid LUT: {reason}")]
    InvalidLut {
        /// Description of the mismatch.
        reason: String,
    },

    /// Node list cannot be turned into a processor.
    #[error("invalid transform: {reason}")]
    InvalidTransform {
        /// Description of what's wrong.
        reason: String,
    },
}
