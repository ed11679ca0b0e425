//! Error types for GPU operations.

use thiserror::Error;

use crate::backend::ShaderStage;

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;

/// GPU error.
///
/// None of these are fatal to a renderer: the previous program and
/// textures stay active and the next load retries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GpuError {
    /// Shader failed to compile.
    #[error("{stage} shader compile error: {log}")]
    ShaderCompile {
        /// Stage that failed.
        stage: ShaderStage,
        /// Driver info log.
        log: String,
    },

    /// Program failed to link.
    #[error("shader program link error: {log}")]
    ProgramLink {
        /// Driver info log.
        log: String,
    },

    /// Texture could not be created or uploaded.
    #[error("texture '{name}' allocation failed: {reason}")]
    TextureAllocation {
        /// Texture name from the shader description.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Source image does not match its declared layout.
    #[error("invalid image: {reason}")]
    InvalidImage {
        /// Description of the mismatch.
        reason: String,
    },

    /// Backend object creation failed.
    #[error("backend error: {reason}")]
    Backend {
        /// Backend message.
        reason: String,
    },
}
