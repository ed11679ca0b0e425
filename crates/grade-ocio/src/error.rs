//! Error types for catalog assembly.

use thiserror::Error;

/// Result type for catalog operations.
pub type OcioResult<T> = Result<T, OcioError>;

/// Errors raised while assembling a [`Config`](crate::Config).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OcioError {
    /// A color space with this name (or alias) already exists.
    #[error("duplicate color space: {name}")]
    DuplicateColorSpace {
        /// Conflicting name.
        name: String,
    },

    /// A look with this name already exists.
    #[error("duplicate look: {name}")]
    DuplicateLook {
        /// Conflicting name.
        name: String,
    },

    /// Role points at a color space the catalog does not have.
    #[error("role '{role}' refers to unknown color space '{colorspace}'")]
    RoleTargetMissing {
        /// Role name.
        role: String,
        /// Missing color space.
        colorspace: String,
    },

    /// View points at a color space the catalog does not have.
    #[error("view '{view}' of display '{display}' refers to unknown color space '{colorspace}'")]
    ViewTargetMissing {
        /// Display name.
        display: String,
        /// View name.
        view: String,
        /// Missing color space.
        colorspace: String,
    },
}
