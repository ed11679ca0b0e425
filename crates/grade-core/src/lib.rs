//! Core types for interactive color grading pipelines.
//!
//! This crate holds what every other part of the workspace agrees on:
//! - [`GradingParameters`]: the knobs a UI mutates, with change notification
//! - [`TransformNode`]: the ordered stages of a pipeline
//! - [`ColorEngine`] / [`CompiledProcessor`]: the engine interface
//! - [`GpuShaderDesc`]: shader text and the resources it declares
//! - [`math`]: per-stage formulas shared by the CPU and GPU paths
//!
//! # Quick Start
//!
//! ```
//! use grade_core::{GradingParameters, GradingSpace};
//!
//! let mut params = GradingParameters::new();
//! assert!(params.is_default());
//!
//! params.set_saturation(2.0);
//! params.set_contrast([1.1, 1.0, 0.9]);
//! params.set_grading_space(GradingSpace::Log);
//!
//! let primary = params.grading_primary();
//! assert_eq!(primary.saturation, 2.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod params;
mod primary;
mod node;
mod engine;
mod shader;

pub mod math;

// Re-exports
pub use error::{CoreError, CoreResult, EngineError, EngineResult};
pub use params::{
    Channels, DynamicProperty, DynamicPropertyKind, GradingParameters, GradingSpace,
    GradingValues, SubscriptionId,
};
pub use primary::{GradingPrimary, NO_CLAMP_BLACK, NO_CLAMP_WHITE};
pub use node::{LookSpec, TransformNode, parse_looks};
pub use engine::{ColorCatalog, ColorEngine, CompiledProcessor, DynamicTarget};
pub use shader::{
    GlslVersion, GpuShaderDesc, Interpolation, Lut3dTexture, LutTexture, TextureChannels,
    UniformDesc, UniformField, UniformValue,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_start_example() {
        let mut params = GradingParameters::new();
        assert!(params.is_default());

        params.set_saturation(2.0);
        assert!(params.is_modified_saturation_only());

        params.set_contrast([1.1, 1.0, 0.9]);
        params.set_grading_space(GradingSpace::Log);

        let primary = params.grading_primary();
        assert_eq!(primary.saturation, 2.0);
        assert_eq!(primary.space, GradingSpace::Log);
        assert_eq!(primary.clamp_black, NO_CLAMP_BLACK);
    }
}
