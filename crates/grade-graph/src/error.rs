//! Error types for graph validation and evaluation.

use grade_core::EngineError;
use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph error.
///
/// Validation failures are distinct variants so a UI can point at the
/// offending field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// No input encoding set.
    #[error("missing input encoding")]
    MissingInputEncoding,

    /// No target display set.
    #[error("missing target display")]
    MissingTargetDisplay,

    /// No target view set.
    #[error("missing target view")]
    MissingTargetView,

    /// Input encoding is not a color space of the catalog.
    #[error("can't find input colorspace <{name}>")]
    UnknownInputEncoding {
        /// Requested name.
        name: String,
    },

    /// Display is not in the catalog's display list.
    #[error("can't find target display <{name}>")]
    UnknownDisplay {
        /// Requested name.
        name: String,
    },

    /// View is not in the display's view list.
    #[error("can't find target view <{view}> for display <{display}>")]
    UnknownView {
        /// Display name.
        display: String,
        /// Requested view.
        view: String,
    },

    /// Pixel buffer does not match its declared layout.
    #[error("invalid pixel buffer: {reason}")]
    InvalidBuffer {
        /// Description of the mismatch.
        reason: String,
    },

    /// The engine rejected the node list.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
